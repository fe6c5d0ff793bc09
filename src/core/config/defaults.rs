pub const GEMINI_CHAT_MODEL: &str = "gemini-2.0-flash";
pub const GEMINI_EMBEDDING_MODEL: &str = "text-embedding-004";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const OPENAI_COMPAT_BASE_URL: &str = "http://localhost:1234";

pub const ACCEPTANCE_THRESHOLD: f32 = 0.60;

pub fn local_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
        "http://127.0.0.1".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "http://127.0.0.1:5173".to_string(),
    ]
}
