//! Language detection.
//!
//! Scores every supported language from three signals: frequent-word hits,
//! orthographic pattern hits, and script presence. A dedicated romanized
//! Hindi wordlist catches Hinglish written in Latin letters, which script
//! inspection alone would misread as English.

use std::sync::OnceLock;

use regex::Regex;

use flowtalk_shared::Language;

use crate::parser::token_regex;

/// Result of detecting the language of a text.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub language: Language,
    /// True when a native language was written in Latin letters
    /// (e.g. Hindi as "muje aapki help chahiye").
    pub is_romanized: bool,
    /// 0.0–1.0, derived from the margin between the best and second-best score.
    pub confidence: f32,
    /// Next-best candidates, strongest first.
    pub fallbacks: Vec<Language>,
}

impl Detection {
    fn default_english() -> Self {
        Self {
            language: Language::En,
            is_romanized: false,
            confidence: 0.3,
            fallbacks: Vec::new(),
        }
    }
}

/// One sentence-level span of a mixed-language text.
#[derive(Debug, Clone, PartialEq)]
pub struct MixedSegment {
    pub text: String,
    pub language: Language,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MixedDetection {
    pub primary: Language,
    pub segments: Vec<MixedSegment>,
}

/// Minimum cleaned length before scoring is meaningful.
const MIN_SIGNAL_CODEPOINTS: usize = 10;

/// Thresholds for the romanized-Hindi decision.
const ROMANIZED_MIN_SCORE: f32 = 0.15;
const ROMANIZED_VS_ENGLISH: f32 = 0.5;

pub struct LanguageDetector;

impl LanguageDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(&self, text: &str) -> Detection {
        let cleaned = clean(text);
        let signal: String = cleaned
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .collect();

        if signal.chars().count() < MIN_SIGNAL_CODEPOINTS {
            return Detection::default_english();
        }

        let tokens: Vec<&str> = signal.split_whitespace().collect();
        let char_len = signal.chars().filter(|c| !c.is_whitespace()).count();

        let mut scores: Vec<(Language, f32)> = Language::ALL
            .iter()
            .map(|&lang| {
                let words = wordlist_score(lang, &tokens);
                let patterns = pattern_score(lang, &cleaned, char_len);
                let script = script_bonus(lang, &cleaned);
                (lang, words + patterns + script)
            })
            .collect();
        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let english = scores
            .iter()
            .find(|(lang, _)| *lang == Language::En)
            .map(|(_, s)| *s)
            .unwrap_or(0.0);

        // Romanized Hindi rides on its own wordlist: it has to clearly beat
        // noise and hold its own against the English score before we commit.
        let romanized = wordlist_hits(HI_ROMANIZED_WORDS, &tokens);
        if romanized > ROMANIZED_MIN_SCORE && romanized > ROMANIZED_VS_ENGLISH * english {
            let best_other = scores
                .iter()
                .find(|(lang, _)| *lang != Language::Hi)
                .map(|(_, s)| *s)
                .unwrap_or(0.0);
            return Detection {
                language: Language::Hi,
                is_romanized: true,
                confidence: confidence_from_ratio(romanized, best_other),
                fallbacks: fallbacks(&scores, Language::Hi),
            };
        }

        let (top_lang, top_score) = scores[0];
        if top_score <= 0.0 {
            return Detection {
                language: Language::En,
                is_romanized: false,
                confidence: 0.4,
                fallbacks: Vec::new(),
            };
        }

        let second_score = scores.get(1).map(|(_, s)| *s).unwrap_or(0.0);

        Detection {
            language: top_lang,
            is_romanized: false,
            confidence: confidence_from_ratio(top_score, second_score),
            fallbacks: fallbacks(&scores, top_lang),
        }
    }

    /// Sentence-level detection for mixed-language content. Each span keeps
    /// its own verdict; the primary language is the one covering the most
    /// characters.
    pub fn detect_mixed(&self, text: &str) -> MixedDetection {
        let splitter = sentence_split_regex();

        let mut segments = Vec::new();
        let mut weights: Vec<(Language, usize)> = Vec::new();

        for piece in splitter.split(text) {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            let detection = self.detect(piece);
            let weight = piece.chars().count();

            match weights.iter_mut().find(|(l, _)| *l == detection.language) {
                Some((_, w)) => *w += weight,
                None => weights.push((detection.language, weight)),
            }
            segments.push(MixedSegment {
                text: piece.to_string(),
                language: detection.language,
            });
        }

        let primary = weights
            .iter()
            .max_by_key(|(_, w)| *w)
            .map(|(l, _)| *l)
            .unwrap_or(Language::En);

        MixedDetection { primary, segments }
    }

    pub fn is_uncertain(&self, text: &str) -> bool {
        self.detect(text).confidence < 0.6
    }
}

impl Default for LanguageDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip mask tokens, lowercase, collapse whitespace. Punctuation stays so
/// the orthographic patterns (¿, ß, …) can still see it.
fn clean(text: &str) -> String {
    let without_tokens = token_regex().replace_all(text, " ");
    let lowered = without_tokens.to_lowercase();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn wordlist_score(lang: Language, tokens: &[&str]) -> f32 {
    wordlist_hits(wordlist(lang), tokens)
}

fn wordlist_hits(list: &[&str], tokens: &[&str]) -> f32 {
    if tokens.is_empty() {
        return 0.0;
    }
    let hits = tokens.iter().filter(|t| list.contains(*t)).count();
    hits as f32 / tokens.len() as f32
}

fn pattern_score(lang: Language, cleaned: &str, char_len: usize) -> f32 {
    let Some(re) = pattern_regex(lang) else {
        return 0.0;
    };
    let hits = re.find_iter(cleaned).count();
    if hits == 0 || char_len == 0 {
        return 0.0;
    }
    (hits as f32 * 2.0 / char_len as f32).min(0.3)
}

/// Fixed increments for script presence. Kana outweighs the shared CJK
/// ideograph bonus so Japanese text (which carries both) resolves to `ja`.
fn script_bonus(lang: Language, text: &str) -> f32 {
    let has = |pred: fn(char) -> bool| text.chars().any(pred);
    let has_any = |set: &str| text.chars().any(|c| set.contains(c));

    match lang {
        Language::Ru => bonus_if(has(is_cyrillic), 0.5),
        Language::Ja => bonus_if(has(is_kana), 0.6),
        Language::Zh => bonus_if(has(is_cjk_ideograph), 0.4),
        Language::Ko => bonus_if(has(is_hangul), 0.5),
        Language::Ar => bonus_if(has(is_arabic), 0.5),
        Language::Hi => bonus_if(has(is_devanagari), 0.5),
        Language::Es => bonus_if(has_any("ñ¿¡"), 0.2) + bonus_if(has_any("áéíóú"), 0.1),
        Language::Fr => bonus_if(has_any("àâçèéêëîïôùûœ"), 0.15),
        Language::Pt => bonus_if(has_any("ãõ"), 0.2) + bonus_if(has_any("áéíóúç"), 0.05),
        Language::It => bonus_if(has_any("àèìòù"), 0.1),
        Language::De => bonus_if(has_any("äöüß"), 0.25),
        Language::En => 0.0,
    }
}

fn bonus_if(present: bool, bonus: f32) -> f32 {
    if present {
        bonus
    } else {
        0.0
    }
}

fn is_cyrillic(c: char) -> bool {
    ('\u{0400}'..='\u{04ff}').contains(&c)
}

fn is_cjk_ideograph(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

fn is_kana(c: char) -> bool {
    ('\u{3040}'..='\u{309f}').contains(&c) || ('\u{30a0}'..='\u{30ff}').contains(&c)
}

fn is_hangul(c: char) -> bool {
    ('\u{ac00}'..='\u{d7af}').contains(&c)
}

fn is_arabic(c: char) -> bool {
    ('\u{0600}'..='\u{06ff}').contains(&c)
}

fn is_devanagari(c: char) -> bool {
    ('\u{0900}'..='\u{097f}').contains(&c)
}

fn confidence_from_ratio(top: f32, second: f32) -> f32 {
    let ratio = top / second.max(0.0001);
    if ratio > 2.0 {
        0.9
    } else if ratio > 1.5 {
        0.75
    } else if ratio > 1.2 {
        0.6
    } else {
        0.4
    }
}

fn fallbacks(scores: &[(Language, f32)], winner: Language) -> Vec<Language> {
    scores
        .iter()
        .filter(|(lang, score)| *lang != winner && *score > 0.0)
        .take(3)
        .map(|(lang, _)| *lang)
        .collect()
}

fn sentence_split_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]+").expect("sentence split regex"))
}

fn pattern_regex(lang: Language) -> Option<&'static Regex> {
    static ES: OnceLock<Regex> = OnceLock::new();
    static FR: OnceLock<Regex> = OnceLock::new();
    static DE: OnceLock<Regex> = OnceLock::new();
    static IT: OnceLock<Regex> = OnceLock::new();
    static PT: OnceLock<Regex> = OnceLock::new();
    static EN: OnceLock<Regex> = OnceLock::new();

    match lang {
        Language::Es => Some(ES.get_or_init(|| Regex::new(r"ción\b|[¿¡]").expect("es patterns"))),
        Language::Fr => Some(FR.get_or_init(|| Regex::new(r"eaux?\b|oux\b").expect("fr patterns"))),
        Language::De => {
            Some(DE.get_or_init(|| Regex::new(r"sch|ung\b|keit\b").expect("de patterns")))
        }
        Language::It => {
            Some(IT.get_or_init(|| Regex::new(r"zione\b|gli\b").expect("it patterns")))
        }
        Language::Pt => {
            Some(PT.get_or_init(|| Regex::new(r"ção\b|ções\b|nh[ao]s?\b").expect("pt patterns")))
        }
        Language::En => {
            Some(EN.get_or_init(|| Regex::new(r"ing\b|tion\b|n't\b").expect("en patterns")))
        }
        _ => None,
    }
}

fn wordlist(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::En => EN_WORDS,
        Language::Es => ES_WORDS,
        Language::Fr => FR_WORDS,
        Language::De => DE_WORDS,
        Language::It => IT_WORDS,
        Language::Pt => PT_WORDS,
        Language::Ru => RU_WORDS,
        Language::Ja => JA_WORDS,
        Language::Ko => KO_WORDS,
        Language::Zh => ZH_WORDS,
        Language::Ar => AR_WORDS,
        Language::Hi => HI_WORDS,
    }
}

const EN_WORDS: &[&str] = &[
    "the", "be", "to", "of", "and", "a", "in", "that", "have", "i", "it", "for", "not", "on",
    "with", "he", "as", "you", "do", "at", "this", "but", "his", "by", "from", "they", "we",
    "say", "her", "she", "or", "an", "will", "my", "one", "all", "would", "there", "their",
    "what", "is", "are", "was", "were", "hello", "world", "please", "thanks",
];

const ES_WORDS: &[&str] = &[
    "el", "la", "de", "que", "y", "a", "en", "un", "una", "ser", "se", "no", "por", "con", "su",
    "para", "como", "estar", "tener", "le", "lo", "los", "las", "todo", "pero", "más", "hacer",
    "o", "poder", "decir", "este", "ir", "otro", "ese", "si", "me", "ya", "es", "está", "hola",
    "gracias", "mundo", "bien", "muy",
];

const FR_WORDS: &[&str] = &[
    "le", "la", "de", "un", "une", "et", "à", "être", "en", "avoir", "que", "pour", "dans", "ce",
    "il", "qui", "ne", "sur", "se", "pas", "plus", "pouvoir", "par", "je", "avec", "tout",
    "faire", "son", "mettre", "autre", "on", "mais", "nous", "comme", "ou", "si", "leur", "est",
    "vous", "les", "des", "bonjour", "merci",
];

const DE_WORDS: &[&str] = &[
    "der", "die", "das", "und", "sein", "in", "ein", "eine", "zu", "haben", "ich", "werden",
    "sie", "von", "nicht", "mit", "es", "sich", "auch", "auf", "für", "an", "er", "so", "dass",
    "können", "dies", "als", "ihr", "ja", "wie", "bei", "oder", "wir", "aber", "dann", "ist",
    "hallo", "danke", "welt",
];

const IT_WORDS: &[&str] = &[
    "il", "la", "di", "che", "e", "un", "una", "a", "essere", "in", "non", "per", "con",
    "avere", "su", "come", "ma", "lo", "si", "io", "questo", "qui", "del", "della", "più",
    "sono", "è", "sei", "ciao", "grazie", "bene", "molto",
];

const PT_WORDS: &[&str] = &[
    "o", "a", "de", "que", "e", "do", "da", "em", "um", "uma", "para", "é", "com", "não", "os",
    "as", "se", "na", "no", "por", "mais", "dos", "como", "mas", "foi", "ao", "ele", "das",
    "tem", "você", "está", "olá", "obrigado", "obrigada", "bem",
];

const RU_WORDS: &[&str] = &[
    "и", "в", "не", "на", "я", "быть", "он", "с", "что", "а", "по", "это", "она", "этот", "к",
    "но", "они", "мы", "как", "из", "у", "то", "за", "свой", "да", "нет", "ты", "вы", "привет",
    "спасибо", "мир",
];

const JA_WORDS: &[&str] = &[
    "は", "の", "に", "を", "た", "が", "で", "て", "と", "し", "れ", "さ", "ある", "いる",
    "も", "する", "から", "な", "こと", "です", "ます", "こんにちは", "ありがとう", "世界",
];

const KO_WORDS: &[&str] = &[
    "이", "그", "저", "것", "수", "들", "있다", "하다", "네", "아니요", "그리고", "하지만",
    "안녕하세요", "감사합니다", "세계",
];

const ZH_WORDS: &[&str] = &[
    "的", "一", "是", "在", "不", "了", "有", "和", "人", "这", "中", "大", "为", "上", "个",
    "我", "你", "他", "们", "好", "你好", "谢谢", "世界",
];

const AR_WORDS: &[&str] = &[
    "في", "من", "على", "أن", "إلى", "عن", "مع", "هذا", "هذه", "كان", "لا", "ما", "هو", "هي",
    "نعم", "شكرا", "مرحبا",
];

const HI_WORDS: &[&str] = &[
    "है", "हैं", "का", "की", "के", "में", "से", "को", "और", "नहीं", "यह", "वह", "पर", "मैं",
    "आप", "क्या", "हम", "नमस्ते", "धन्यवाद",
];

/// Frequent Hindi words as they are commonly romanized in chat.
const HI_ROMANIZED_WORDS: &[&str] = &[
    "hai", "hain", "nahi", "nahin", "kaise", "kya", "kyun", "kyunki", "muje", "mujhe",
    "mujhko", "aap", "aapki", "aapka", "aapko", "tum", "tumhara", "hum", "acha", "accha",
    "theek", "thik", "chahiye", "karo", "karna", "raha", "rahi", "rahe", "hoon", "mera",
    "meri", "tera", "teri", "bhai", "yaar", "matlab", "bahut", "thoda", "abhi", "kab",
    "kahan", "lekin", "aur", "toh", "haan", "ji", "wala", "wali", "bhi", "kuch", "sab",
    "log", "baat", "din", "ghar", "paani", "khana", "jaldi", "namaste", "shukriya",
];
