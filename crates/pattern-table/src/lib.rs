//! Canned small-talk replies driven by a fixed table of regular expressions.
//!
//! A [`PatternTable`] is an ordered list of rules. Each rule pairs a regex with
//! a set of interchangeable responses. Matching is a case-insensitive,
//! unanchored search; the first rule that matches wins and one of its responses
//! is picked uniformly at random.
//!
//! Responses may contain `{time}` and `{date}` placeholders, expanded from the
//! local clock each time the rule fires.
//!
//! This crate has no dependencies on other evobot crates.

use chrono::{DateTime, Local};
use rand::Rng;
use regex::{Regex, RegexBuilder};

/// A single rule: regex plus the responses it can produce.
#[derive(Debug, Clone)]
struct Rule {
    regex: Regex,
    responses: Vec<String>,
}

/// Ordered regex → response-set rules, fixed at construction.
#[derive(Debug, Clone)]
pub struct PatternTable {
    rules: Vec<Rule>,
}

impl PatternTable {
    /// Build a table from `(pattern, responses)` pairs, in priority order.
    ///
    /// Every pattern is compiled case-insensitively. A malformed pattern is a
    /// programming error in the table and fails construction.
    ///
    /// # Examples
    ///
    /// ```
    /// use pattern_table::PatternTable;
    /// use rand::SeedableRng;
    /// use rand::rngs::SmallRng;
    ///
    /// let table = PatternTable::new(&[(r"hello|hi", &["Hey there!"][..])]).unwrap();
    /// let mut rng = SmallRng::seed_from_u64(1);
    /// assert_eq!(table.find("Oh, HELLO bot", &mut rng).as_deref(), Some("Hey there!"));
    /// assert_eq!(table.find("goodbye", &mut rng), None);
    /// ```
    pub fn new(rules: &[(&str, &[&str])]) -> Result<Self, regex::Error> {
        let rules = rules
            .iter()
            .map(|(pattern, responses)| {
                let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
                Ok(Rule {
                    regex,
                    responses: responses.iter().map(|r| r.to_string()).collect(),
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(PatternTable { rules })
    }

    /// An empty table that never matches.
    pub fn empty() -> Self {
        PatternTable { rules: Vec::new() }
    }

    /// The built-in Portuguese small-talk table.
    pub fn portuguese() -> Self {
        PatternTable::new(PORTUGUESE_RULES).expect("built-in Portuguese patterns are valid")
    }

    /// Number of rules in the table.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the table has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Find a canned reply for `text`.
    ///
    /// Returns a random response from the first rule whose regex matches
    /// anywhere in `text`, or `None` if no rule matches. Rules with an empty
    /// response set are skipped.
    pub fn find<R: Rng>(&self, text: &str, rng: &mut R) -> Option<String> {
        self.find_at(text, Local::now(), rng)
    }

    /// Like [`find`](Self::find), expanding placeholders against `now`.
    pub fn find_at<R: Rng>(&self, text: &str, now: DateTime<Local>, rng: &mut R) -> Option<String> {
        let rule = self
            .rules
            .iter()
            .find(|rule| !rule.responses.is_empty() && rule.regex.is_match(text))?;
        let idx = rng.random_range(0..rule.responses.len());
        Some(expand_placeholders(&rule.responses[idx], now))
    }
}

impl Default for PatternTable {
    fn default() -> Self {
        PatternTable::portuguese()
    }
}

/// Replace `{time}` with `HH:MM` and `{date}` with `DD/MM/YYYY`.
fn expand_placeholders(template: &str, now: DateTime<Local>) -> String {
    if !template.contains('{') {
        return template.to_string();
    }
    template
        .replace("{time}", &now.format("%H:%M").to_string())
        .replace("{date}", &now.format("%d/%m/%Y").to_string())
}

const PORTUGUESE_RULES: &[(&str, &[&str])] = &[
    (
        r"ol[aá]|oi|e a[ií]|tudo bem",
        &[
            "Olá! Como posso ajudar você hoje?",
            "Oi! Em que posso ser útil?",
            "Olá! Estou aqui para ajudar. O que você precisa?",
        ],
    ),
    (
        r"como vai|como est[aá]|tudo bem",
        &[
            "Estou bem, obrigado por perguntar! E você?",
            "Tudo ótimo! Como posso ajudar hoje?",
            "Estou funcionando perfeitamente! Como posso ser útil?",
        ],
    ),
    (
        r"quem [ée] voc[eê]|seu nome|como se chama",
        &[
            "Sou o Self-Evolving Bot, um assistente virtual que aprende com nossas conversas.",
            "Meu nome é Self-Evolving Bot. Sou um assistente de IA projetado para evoluir com cada interação.",
            "Sou um assistente virtual chamado Self-Evolving Bot. Estou aqui para aprender e ajudar!",
        ],
    ),
    (
        r"obrigad[oa]|valeu|agradecido",
        &[
            "De nada! Fico feliz em ajudar.",
            "Por nada! Estou aqui quando precisar.",
            "Disponha! Se precisar de mais alguma coisa, é só pedir.",
        ],
    ),
    (
        r"tchau|adeus|at[eé] (logo|mais)|vou sair",
        &[
            "Até mais! Foi um prazer conversar com você.",
            "Tchau! Volte quando quiser conversar novamente.",
            "Adeus! Tenha um ótimo dia!",
        ],
    ),
    (
        r"o que voc[eê] (pode|sabe) fazer",
        &[
            "Posso conversar sobre diversos assuntos, responder perguntas e aprender com nossas interações.",
            "Sou capaz de manter um diálogo, responder perguntas e melhorar com o tempo através de treinamento.",
            "Estou aqui para conversar e ajudar com informações. Também aprendo com cada conversa!",
        ],
    ),
    (
        r"hora|que horas s[aã]o",
        &[
            "Agora são {time}.",
            "O horário atual é {time}.",
            "São {time} no momento.",
        ],
    ),
    (
        r"data|dia (é hoje|hoje é|atual)",
        &[
            "Hoje é {date}.",
            "A data atual é {date}.",
            "Estamos em {date}.",
        ],
    ),
    (
        r"tempo|clima",
        &[
            "Não tenho acesso a informações de tempo em tempo real, mas posso ajudar com outras perguntas!",
            "Infelizmente não posso verificar o clima atual, pois funciono offline.",
            "Como sou um assistente offline, não posso verificar o clima no momento.",
        ],
    ),
    (
        r"conte (uma|alguma) piada",
        &[
            "Por que o computador foi ao médico? Porque estava com vírus!",
            "O que o zero disse para o oito? Bonito cinto!",
            "Por que o livro de matemática ficou triste? Porque tinha muitos problemas.",
        ],
    ),
    (
        r"voc[eê] [ée] (inteligente|esperto)",
        &[
            "Sou tão inteligente quanto meus treinamentos me permitem ser. E estou sempre aprendendo!",
            "Tenho capacidade de aprender e evoluir com cada conversa. Então espero ficar cada vez mais inteligente!",
            "Minha inteligência é baseada em aprendizado contínuo. Cada conversa me ajuda a melhorar!",
        ],
    ),
];
