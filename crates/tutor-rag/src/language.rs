//! Indonesian / English detection by stop-word scoring.

use serde::{Deserialize, Serialize};

/// Inputs with fewer letters than this are undetermined.
const MIN_LETTERS: usize = 3;

const INDONESIAN: &[&str] = &[
    "yang", "dan", "di", "ke", "dari", "ini", "itu", "dengan", "untuk", "adalah",
    "tidak", "apa", "apakah", "bagaimana", "mengapa", "kenapa", "saya", "aku", "kamu",
    "anda", "dalam", "pada", "akan", "bisa", "juga", "atau", "ada", "karena", "jelaskan",
    "tolong", "siapa", "kapan", "sudah", "belum", "tentang", "seperti", "oleh", "sebagai",
    "mereka", "kami", "kita", "berapa", "mana", "yg", "gak", "nggak", "tapi", "jika",
    "kalau", "bagi", "antara", "contoh", "berikan", "sebutkan", "maksud", "cara", "buat",
];

const ENGLISH: &[&str] = &[
    "the", "and", "is", "are", "of", "to", "in", "what", "how", "why", "who", "when",
    "where", "which", "this", "that", "with", "for", "you", "i", "it", "a", "an", "can",
    "do", "does", "explain", "please", "about", "be", "was", "were", "my", "your", "on",
    "from", "have", "has", "not", "or", "tell", "me", "give", "example", "between",
    "difference", "could", "would", "should", "there", "their", "they", "we",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "id")]
    Indonesian,
    #[serde(rename = "en")]
    English,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Indonesian => "id",
            Language::English => "en",
        }
    }

    /// Sentence appended to the persona line of every prompt.
    pub fn instruction(&self) -> &'static str {
        match self {
            Language::Indonesian => "Jawab dalam Bahasa Indonesia yang jelas dan mudah dipahami.",
            Language::English => "Answer in clear and easy-to-understand English.",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Guess whether `text` is Indonesian or English.
///
/// Anything undetermined (too short, no stop words, a tie) is Indonesian.
pub fn detect_language(text: &str) -> Language {
    if text.chars().filter(|c| c.is_alphabetic()).count() < MIN_LETTERS {
        return Language::Indonesian;
    }

    let mut id_score = 0usize;
    let mut en_score = 0usize;
    for word in text
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
    {
        let word = word.to_lowercase();
        if INDONESIAN.contains(&word.as_str()) {
            id_score += 1;
        }
        if ENGLISH.contains(&word.as_str()) {
            en_score += 1;
        }
    }

    if en_score > id_score {
        Language::English
    } else {
        Language::Indonesian
    }
}
