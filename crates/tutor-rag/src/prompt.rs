//! Prompt assembly for the TutorAI persona.

use crate::indexer::RetrievedChunk;
use crate::language::Language;

pub const PERSONA: &str = "Kamu adalah TutorAI, asisten pembelajaran yang cerdas dan membantu.";
pub const NO_CONTEXT: &str = "Tidak ada konteks khusus yang tersedia.";

const INSTRUCTIONS: &str = "\
INSTRUKSI:
1. Gunakan informasi dari konteks dokumen dan riwayat percakapan jika relevan
2. Jika pengguna merujuk ke percakapan sebelumnya, gunakan riwayat untuk memahami konteks
3. Jika konteks tidak cukup, berikan jawaban umum berdasarkan pengetahuanmu
4. Berikan penjelasan yang jelas, terstruktur, dan mudah dipahami
5. Jika perlu, berikan contoh untuk memperjelas
6. Jika tidak tahu jawabannya, jujur katakan dan berikan saran alternatif";

/// One earlier exchange in the same session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub message: String,
    pub reply: String,
}

impl ChatTurn {
    pub fn new(message: impl Into<String>, reply: impl Into<String>) -> Self {
        Self { message: message.into(), reply: reply.into() }
    }
}

/// Numbered chunk list, or a fixed notice when nothing was retrieved.
pub fn format_context(chunks: &[RetrievedChunk]) -> String {
    if chunks.is_empty() {
        return NO_CONTEXT.to_string();
    }
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("[{}] {}", i + 1, chunk.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn format_history(history: &[ChatTurn]) -> String {
    if history.is_empty() {
        return String::new();
    }
    let turns = history
        .iter()
        .map(|t| format!("User: {}\nAssistant: {}", t.message, t.reply))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("\nRIWAYAT PERCAKAPAN SEBELUMNYA:\n{turns}\n")
}

pub fn build_prompt(
    message: &str,
    context: &[RetrievedChunk],
    language: Language,
    history: &[ChatTurn],
) -> String {
    format!(
        "{PERSONA} {instruction}\n\
         \n\
         KONTEKS DARI DOKUMEN:\n\
         {context}\n\
         {history}\n\
         PERTANYAAN PENGGUNA SAAT INI:\n\
         {message}\n\
         \n\
         {INSTRUCTIONS}\n\
         \n\
         JAWABAN:",
        instruction = language.instruction(),
        context = format_context(context),
        history = format_history(history),
    )
}

/// Prompt without retrieved context or history.
pub fn build_direct_prompt(message: &str, language: Language) -> String {
    format!(
        "{PERSONA} {instruction}\n\nPERTANYAAN: {message}\n\nJAWABAN:",
        instruction = language.instruction(),
    )
}
