use serde::Serialize;

/// A topic category: trigger keywords and the fixed reply they select
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Topic {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    #[serde(skip)]
    pub reply: &'static str,
}

/// Keyword-matched reply table.
///
/// Categories and keywords are scanned in declaration order and the first
/// keyword contained in the normalized utterance wins.
#[derive(Debug, Clone, Copy)]
pub struct ResponderRegistry {
    topics: &'static [Topic],
    default_reply: &'static str,
}

pub const DEFAULT_REPLY: &str = "**Gracias por tu consulta. Nuestro equipo está aquí para ayudarte. ¿Hay algo más en lo que pueda asistirte?**";

const TOPICS: &[Topic] = &[
    Topic {
        name: "hola",
        keywords: &[
            "hola",
            "buenos días",
            "buenos dias",
            "buenas tardes",
            "buenas noches",
            "hi",
            "hello",
            "saludos",
        ],
        reply: "**¡Hola! Soy el asistente de Goland. ¿En qué puedo ayudarte hoy?**",
    },
    Topic {
        name: "productos",
        keywords: &[
            "producto",
            "productos",
            "qué tienen",
            "que tienen",
            "qué venden",
            "que venden",
            "catálogo",
            "catalogo",
            "qué ofrecen",
            "que ofrecen",
        ],
        reply: "**Tenemos una amplia variedad de productos a base de cáñamo: semillas, aceites, proteínas y más. ¿Te interesa alguno en particular?**",
    },
    Topic {
        name: "precio",
        keywords: &[
            "precio",
            "precios",
            "cuánto cuesta",
            "cuanto cuesta",
            "costo",
            "valor",
            "tarifa",
        ],
        reply: "**Los precios varían según el producto. Te recomiendo visitar nuestra tienda online en shop.goland-group.com para ver los precios actualizados.**",
    },
    Topic {
        name: "ingredientes",
        keywords: &[
            "ingrediente",
            "ingredientes",
            "qué contiene",
            "que contiene",
            "de qué está hecho",
            "de que esta hecho",
            "composición",
            "composicion",
            "natural",
        ],
        reply: "**Nuestros productos están hechos con ingredientes 100% naturales, sin conservantes artificiales, veganos y sin gluten. ¿Quieres saber más sobre algún producto específico?**",
    },
    Topic {
        name: "envio",
        keywords: &[
            "envío",
            "envio",
            "entrega",
            "shipping",
            "delivery",
            "enviar",
            "cuánto tarda",
            "cuanto tarda",
        ],
        reply: "**Realizamos envíos a todo Uruguay. El tiempo de entrega depende de tu ubicación, generalmente entre 3 a 7 días hábiles.**",
    },
];

impl ResponderRegistry {
    /// Registry for the storefront assistant
    pub const fn builtin() -> Self {
        Self {
            topics: TOPICS,
            default_reply: DEFAULT_REPLY,
        }
    }

    pub const fn new(topics: &'static [Topic], default_reply: &'static str) -> Self {
        Self {
            topics,
            default_reply,
        }
    }

    /// Resolve an utterance to its reply. Total: unmatched or empty input
    /// gets the default reply.
    pub fn resolve(&self, utterance: &str) -> &'static str {
        self.find_topic(utterance)
            .map(|topic| topic.reply)
            .unwrap_or(self.default_reply)
    }

    /// First topic with a keyword contained in the utterance
    pub fn find_topic(&self, utterance: &str) -> Option<&Topic> {
        let normalized = utterance.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }
        self.topics.iter().find(|topic| {
            topic
                .keywords
                .iter()
                .any(|keyword| normalized.contains(keyword))
        })
    }

    /// Topics whose name, a keyword or the reply contains `query`
    /// (case-insensitive)
    pub fn search(&self, query: &str) -> Vec<&'static Topic> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.topics
            .iter()
            .filter(|topic| {
                topic.name.contains(&needle)
                    || topic.keywords.iter().any(|k| k.contains(&needle))
                    || topic.reply.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn topics(&self) -> &'static [Topic] {
        self.topics
    }
}

impl Default for ResponderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
