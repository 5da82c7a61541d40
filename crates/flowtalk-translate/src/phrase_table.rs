//! Deterministic phrase-table fallback.
//!
//! A built-in lookup of common short phrases across the supported languages,
//! used when the adapter is configured offline or a degraded mode is
//! requested. Each row is aligned with [`Language::ALL`].

use flowtalk_shared::Language;

use crate::cache::normalize;

/// Rows aligned with `Language::ALL`:
/// en, es, fr, de, it, pt, ru, ja, ko, zh, ar, hi.
const PHRASES: &[[&str; 12]] = &[
    [
        "hello", "hola", "bonjour", "hallo", "ciao", "olá", "привет", "こんにちは", "안녕하세요",
        "你好", "مرحبا", "नमस्ते",
    ],
    [
        "hello world",
        "hola mundo",
        "bonjour le monde",
        "hallo welt",
        "ciao mondo",
        "olá mundo",
        "привет мир",
        "こんにちは世界",
        "안녕하세요 세계",
        "你好世界",
        "مرحبا بالعالم",
        "नमस्ते दुनिया",
    ],
    [
        "good morning",
        "buenos días",
        "bonjour",
        "guten morgen",
        "buongiorno",
        "bom dia",
        "доброе утро",
        "おはようございます",
        "좋은 아침",
        "早上好",
        "صباح الخير",
        "सुप्रभात",
    ],
    [
        "thank you",
        "gracias",
        "merci",
        "danke",
        "grazie",
        "obrigado",
        "спасибо",
        "ありがとう",
        "감사합니다",
        "谢谢",
        "شكرا",
        "धन्यवाद",
    ],
    [
        "how are you",
        "¿cómo estás?",
        "comment ça va",
        "wie geht es dir",
        "come stai",
        "como você está",
        "как дела",
        "お元気ですか",
        "어떻게 지내세요",
        "你好吗",
        "كيف حالك",
        "आप कैसे हैं",
    ],
    [
        "yes", "sí", "oui", "ja", "sì", "sim", "да", "はい", "네", "是", "نعم", "हाँ",
    ],
    [
        "no", "no", "non", "nein", "no", "não", "нет", "いいえ", "아니요", "不", "لا", "नहीं",
    ],
    [
        "goodbye",
        "adiós",
        "au revoir",
        "auf wiedersehen",
        "arrivederci",
        "adeus",
        "до свидания",
        "さようなら",
        "안녕히 가세요",
        "再见",
        "مع السلامة",
        "अलविदा",
    ],
    [
        "please",
        "por favor",
        "s'il vous plaît",
        "bitte",
        "per favore",
        "por favor",
        "пожалуйста",
        "お願いします",
        "제발",
        "请",
        "من فضلك",
        "कृपया",
    ],
    [
        "welcome",
        "bienvenido",
        "bienvenue",
        "willkommen",
        "benvenuto",
        "bem-vindo",
        "добро пожаловать",
        "ようこそ",
        "환영합니다",
        "欢迎",
        "أهلا بك",
        "स्वागत है",
    ],
];

/// Translate a common phrase, matching the input against any source language.
/// Returns `None` when the phrase is not in the table.
pub fn lookup(text: &str, target: Language) -> Option<&'static str> {
    let needle = normalize(text);
    let target_idx = language_index(target);

    PHRASES
        .iter()
        .find(|row| row.iter().any(|cell| normalize(cell) == needle))
        .map(|row| row[target_idx])
}

fn language_index(lang: Language) -> usize {
    Language::ALL
        .iter()
        .position(|&l| l == lang)
        .expect("every language is in ALL")
}
