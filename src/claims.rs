//! Claim Extractor (spec §4.2)
//!
//! Three regex families — numeric, attribution, event — scan the
//! concatenation `title + ". " + body`. Patterns are compiled once via
//! `Lazy<Regex>` at module scope rather than per call, matching the
//! "pre-compile patterns once at construction time" design note.

use md5::{Digest, Md5};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimKind {
    Numeric,
    Attribution,
    Event,
    Factual,
    Statement,
    Prediction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Person,
    Organization,
    Location,
    Date,
    Money,
    Percentage,
    Quantity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub kind: EntityKind,
    pub normalized: String,
    pub start: usize,
    pub end: usize,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedClaim {
    pub claim_id: String,
    pub kind: ClaimKind,
    pub text: String,
    pub normalized: String,
    pub fingerprint: String,
    pub entities: Vec<Entity>,
    pub source_article_id: String,
    pub source_name: String,
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub numeric_value: Option<f64>,
    pub numeric_unit: String,
    pub numeric_context: String,
    pub confidence: f64,
}

impl ExtractedClaim {
    fn base(
        kind: ClaimKind,
        article_id: &str,
        source_name: &str,
        text: String,
        confidence: f64,
    ) -> Self {
        let normalized = normalize_claim(&text);
        let fingerprint = generate_fingerprint(&normalized);
        let claim_id = format!("{article_id}_{}", &fingerprint[..8]);
        Self {
            claim_id,
            kind,
            text,
            normalized,
            fingerprint,
            entities: Vec::new(),
            source_article_id: article_id.to_string(),
            source_name: source_name.to_string(),
            subject: String::new(),
            predicate: String::new(),
            object: String::new(),
            numeric_value: None,
            numeric_unit: String::new(),
            numeric_context: String::new(),
            confidence,
        }
    }
}

static NUMERIC_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:percent|%)").unwrap(),
            "percentage",
        ),
        (
            Regex::new(r"(?i)(?:Rs\.?|LKR|USD|\$)\s*(\d+(?:,\d{3})*(?:\.\d+)?)\s*(million|billion|trillion)?")
                .unwrap(),
            "money",
        ),
        (
            Regex::new(r"(?i)(\d+(?:,\d{3})*(?:\.\d+)?)\s*(million|billion|trillion)?\s*(?:rupees|dollars)")
                .unwrap(),
            "money",
        ),
        (
            Regex::new(
                r"(?i)(\d+(?:,\d{3})*(?:\.\d+)?)\s*(people|persons|deaths|cases|vehicles|units|tons|kg|km)",
            )
            .unwrap(),
            "quantity",
        ),
    ]
});

static INCREASE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)increas(?:ed?|ing)|rose?|risen|rising|grew|growing|growth|jump(?:ed)?|surge(?:d)?|surging|climb(?:ed)?|climbing")
        .unwrap()
});

static DECREASE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)decreas(?:ed?|ing)|fell|fallen|falling|drop(?:ped)?|dropping|declin(?:ed?|ing)|shr(?:a|u)nk|shrinking|plung(?:ed)?|plunging")
        .unwrap()
});

static ATTRIBUTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?is)(?P<speaker>[A-Z][a-z]+ [A-Z][a-z]+)\s+said\s+(?:that\s+)?[\x22']?(?P<statement>.+?)[\x22']?(?:\.|$)").unwrap(),
        Regex::new(r"(?is)according to\s+(?P<speaker>[A-Z][^,]+),?\s+(?P<statement>.+?)(?:\.|$)").unwrap(),
        Regex::new(r"(?is)(?P<speaker>[A-Z][a-z]+ [A-Z][a-z]+)\s+announced\s+(?:that\s+)?(?P<statement>.+?)(?:\.|$)").unwrap(),
        Regex::new(r"(?is)(?P<speaker>[A-Z][a-z]+ [A-Z][a-z]+)\s+stated\s+(?:that\s+)?[\x22']?(?P<statement>.+?)[\x22']?(?:\.|$)").unwrap(),
    ]
});

static EVENT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)(?P<event>flood(?:s|ing)?|earthquake|storm|cyclone|drought)\s+(?:hit|struck|affected)\s+(?P<location>[A-Z][a-z]+)").unwrap(),
        Regex::new(r"(?i)(?P<event>protest(?:s)?|strike(?:s)?|demonstration(?:s)?)\s+(?:in|at|near)\s+(?P<location>[A-Z][a-z]+)").unwrap(),
        Regex::new(r"(?i)(?P<event>accident|crash|collision)\s+(?:on|at|near)\s+(?P<location>.+?)(?:,|\.|$)").unwrap(),
    ]
});

static ORG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(Central Bank|CBSL|IMF|World Bank|Government|Ministry of [A-Z][a-z]+|[A-Z]{2,5})\b").unwrap()
});

static MONEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:Rs\.?|LKR|USD|\$)\s*(\d+(?:,\d{3})*(?:\.\d+)?(?:\s*(?:million|billion|trillion))?)").unwrap()
});

static PCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*(?:percent|%)").unwrap());

static LOCATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:in|at|near|from)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)\b").unwrap());

// The `regex` crate has no lookbehind support, so sentence boundaries are
// matched and kept (not split away) rather than asserted with `(?<=[.!?])`.
static SENTENCE_BOUNDARY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").unwrap());

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "is", "was", "were", "are", "been", "be", "have", "has", "had", "do",
    "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall", "can",
    "that", "this", "these", "those", "it", "its", "to", "of", "in", "for", "on", "with", "at",
    "by", "from", "as", "into", "through", "during", "before", "after", "above", "below",
    "between", "and", "but", "or", "nor", "so", "yet",
];

/// Lowercase, collapse whitespace, strip punctuation (keep `%` and `.`),
/// remove digit-grouping commas.
pub fn normalize_claim(text: &str) -> String {
    let lowered = text.to_lowercase();
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    let stripped: String = collapsed
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '%' || *c == '.')
        .collect();
    let mut out = String::with_capacity(stripped.len());
    let chars: Vec<char> = stripped.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == ','
            && i > 0
            && i + 1 < chars.len()
            && chars[i - 1].is_ascii_digit()
            && chars[i + 1].is_ascii_digit()
        {
            i += 1;
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// MD5 of the lex-sorted non-stopword tokens of the normalized text.
pub fn generate_fingerprint(normalized_text: &str) -> String {
    let mut tokens: Vec<&str> = normalized_text
        .split_whitespace()
        .filter(|t| !STOPWORDS.contains(t))
        .collect();
    tokens.sort_unstable();
    let joined = tokens.join(" ");
    let mut hasher = Md5::new();
    hasher.update(joined.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut last_end = 0;
    for m in SENTENCE_BOUNDARY_RE.find_iter(text) {
        let boundary = m.start() + 1; // keep the terminating punctuation
        sentences.push(text[last_end..boundary].trim().to_string());
        last_end = m.end();
    }
    if last_end < text.len() {
        sentences.push(text[last_end..].trim().to_string());
    }
    sentences.into_iter().filter(|s| !s.is_empty()).collect()
}

pub struct ClaimExtractor;

impl ClaimExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract_claims(
        &self,
        content: &str,
        title: &str,
        article_id: &str,
        source_name: &str,
    ) -> Vec<ExtractedClaim> {
        let full_text = if title.is_empty() {
            content.to_string()
        } else {
            format!("{title}. {content}")
        };

        let mut claims = Vec::new();
        claims.extend(self.extract_numeric_claims(&full_text, article_id, source_name));
        claims.extend(self.extract_attribution_claims(&full_text, article_id, source_name));
        claims.extend(self.extract_event_claims(&full_text, article_id, source_name));
        claims
    }

    fn extract_numeric_claims(
        &self,
        text: &str,
        article_id: &str,
        source_name: &str,
    ) -> Vec<ExtractedClaim> {
        let mut claims = Vec::new();
        for sentence in split_sentences(text) {
            for (pattern, unit_type) in NUMERIC_PATTERNS.iter() {
                for caps in pattern.captures_iter(&sentence) {
                    let value_str = match caps.get(1) {
                        Some(m) => m.as_str().replace(',', ""),
                        None => continue,
                    };
                    let mut value: f64 = match value_str.parse() {
                        Ok(v) => v,
                        Err(_) => continue,
                    };

                    if let Some(mult) = caps.get(2) {
                        value *= match mult.as_str().to_lowercase().as_str() {
                            "million" => 1_000_000.0,
                            "billion" => 1_000_000_000.0,
                            "trillion" => 1_000_000_000_000.0,
                            _ => 1.0,
                        };
                    }

                    let context = if INCREASE_RE.is_match(&sentence) {
                        "increased"
                    } else if DECREASE_RE.is_match(&sentence) {
                        "decreased"
                    } else {
                        "stated"
                    };

                    let mut claim = ExtractedClaim::base(
                        ClaimKind::Numeric,
                        article_id,
                        source_name,
                        sentence.clone(),
                        0.85,
                    );
                    claim.numeric_value = Some(value);
                    claim.numeric_unit = unit_type.to_string();
                    claim.numeric_context = context.to_string();
                    claim.entities = extract_entities(&sentence);
                    claims.push(claim);
                }
            }
        }
        claims
    }

    fn extract_attribution_claims(
        &self,
        text: &str,
        article_id: &str,
        source_name: &str,
    ) -> Vec<ExtractedClaim> {
        let mut claims = Vec::new();
        for pattern in ATTRIBUTION_PATTERNS.iter() {
            for caps in pattern.captures_iter(text) {
                let (speaker, statement) = match (caps.name("speaker"), caps.name("statement")) {
                    (Some(s), Some(st)) => (s.as_str(), st.as_str()),
                    _ => continue,
                };

                let full_match = caps.get(0).unwrap().as_str().trim().to_string();
                let object = if statement.chars().count() > 100 {
                    statement.chars().take(100).collect::<String>()
                } else {
                    statement.to_string()
                };

                let mut claim = ExtractedClaim::base(
                    ClaimKind::Attribution,
                    article_id,
                    source_name,
                    full_match,
                    0.9,
                );
                claim.normalized = normalize_claim(statement);
                claim.fingerprint = generate_fingerprint(&claim.normalized);
                claim.claim_id = format!("{article_id}_{}", &claim.fingerprint[..8]);
                claim.subject = speaker.to_string();
                claim.predicate = "said".to_string();
                claim.object = object;
                claim.entities.push(Entity {
                    text: speaker.to_string(),
                    kind: EntityKind::Person,
                    normalized: speaker.to_lowercase(),
                    start: 0,
                    end: 0,
                    confidence: 0.9,
                });
                claims.push(claim);
            }
        }
        claims
    }

    fn extract_event_claims(
        &self,
        text: &str,
        article_id: &str,
        source_name: &str,
    ) -> Vec<ExtractedClaim> {
        let mut claims = Vec::new();
        for pattern in EVENT_PATTERNS.iter() {
            for caps in pattern.captures_iter(text) {
                let (event, location) = match (caps.name("event"), caps.name("location")) {
                    (Some(e), Some(l)) => (e.as_str(), l.as_str()),
                    _ => continue,
                };

                let full_match = caps.get(0).unwrap().as_str().trim().to_string();
                let mut claim = ExtractedClaim::base(
                    ClaimKind::Event,
                    article_id,
                    source_name,
                    full_match,
                    0.85,
                );
                claim.subject = event.to_string();
                claim.predicate = "occurred at".to_string();
                claim.object = location.to_string();
                claim.entities.push(Entity {
                    text: location.to_string(),
                    kind: EntityKind::Location,
                    normalized: location.to_lowercase(),
                    start: 0,
                    end: 0,
                    confidence: 0.85,
                });
                claims.push(claim);
            }
        }
        claims
    }
}

impl Default for ClaimExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Organizations/acronyms, money, percentage, location-after-preposition.
pub fn extract_entities(text: &str) -> Vec<Entity> {
    let mut entities = Vec::new();

    for caps in ORG_RE.captures_iter(text) {
        let m = caps.get(1).unwrap();
        entities.push(Entity {
            text: m.as_str().to_string(),
            kind: EntityKind::Organization,
            normalized: m.as_str().to_lowercase(),
            start: m.start(),
            end: m.end(),
            confidence: 0.8,
        });
    }

    for caps in MONEY_RE.captures_iter(text) {
        let m = caps.get(0).unwrap();
        entities.push(Entity {
            text: m.as_str().to_string(),
            kind: EntityKind::Money,
            normalized: m.as_str().to_lowercase(),
            start: m.start(),
            end: m.end(),
            confidence: 0.9,
        });
    }

    for caps in PCT_RE.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        let value = caps.get(1).unwrap().as_str();
        entities.push(Entity {
            text: whole.as_str().to_string(),
            kind: EntityKind::Percentage,
            normalized: format!("{value}%"),
            start: whole.start(),
            end: whole.end(),
            confidence: 0.95,
        });
    }

    for caps in LOCATION_RE.captures_iter(text) {
        let m = caps.get(1).unwrap();
        entities.push(Entity {
            text: m.as_str().to_string(),
            kind: EntityKind::Location,
            normalized: m.as_str().to_lowercase(),
            start: m.start(),
            end: m.end(),
            confidence: 0.7,
        });
    }

    entities
}

/// `FindMatchingClaims` (spec §4.2): same-article pairs skipped, exact
/// fingerprint match short-circuits to 1.0, numeric claims compare relative
/// difference, everything else falls back to Jaccard over normalized tokens.
pub fn find_matching_claims<'a>(
    claim: &ExtractedClaim,
    others: &'a [ExtractedClaim],
    threshold: f64,
) -> Vec<(&'a ExtractedClaim, f64)> {
    let mut matches = Vec::new();

    for other in others {
        if other.source_article_id == claim.source_article_id {
            continue;
        }

        if claim.fingerprint == other.fingerprint {
            matches.push((other, 1.0));
            continue;
        }

        if claim.kind != other.kind {
            continue;
        }

        if claim.kind == ClaimKind::Numeric {
            if let (Some(v1), Some(v2)) = (claim.numeric_value, other.numeric_value) {
                let max_val = v1.abs().max(v2.abs());
                if max_val > 0.0 {
                    let diff = (v1 - v2).abs() / max_val;
                    let similarity = 1.0 - diff.min(1.0);
                    if similarity >= threshold {
                        matches.push((other, similarity));
                    }
                }
            }
        } else {
            let similarity = jaccard_similarity(&claim.normalized, &other.normalized);
            if similarity >= threshold {
                matches.push((other, similarity));
            }
        }
    }

    matches.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    matches
}

pub fn jaccard_similarity(text1: &str, text2: &str) -> f64 {
    use std::collections::HashSet;
    let words1: HashSet<&str> = text1.split_whitespace().collect();
    let words2: HashSet<&str> = text2.split_whitespace().collect();
    let intersection = words1.intersection(&words2).count();
    let union = words1.union(&words2).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_punctuation_keeps_percent_and_period() {
        let out = normalize_claim("Inflation rose 12.5%, reaching a new high!");
        assert_eq!(out, "inflation rose 12.5 reaching a new high");
    }

    #[test]
    fn normalize_removes_digit_grouping_commas() {
        let out = normalize_claim("Losses of 1,200,000 rupees were reported.");
        assert!(out.contains("1200000"));
    }

    #[test]
    fn fingerprint_is_order_independent() {
        let a = generate_fingerprint(&normalize_claim("prices rose sharply today"));
        let b = generate_fingerprint(&normalize_claim("today prices rose sharply"));
        assert_eq!(a, b);
    }

    #[test]
    fn extract_numeric_claim_with_percentage() {
        let extractor = ClaimExtractor::new();
        let claims = extractor.extract_claims(
            "Inflation increased by 12.5 percent last month.",
            "",
            "art1",
            "reuters",
        );
        let numeric = claims.iter().find(|c| c.kind == ClaimKind::Numeric).unwrap();
        assert_eq!(numeric.numeric_value, Some(12.5));
        assert_eq!(numeric.numeric_context, "increased");
    }

    #[test]
    fn extract_numeric_claim_applies_million_multiplier() {
        let extractor = ClaimExtractor::new();
        let claims =
            extractor.extract_claims("The government allocated Rs. 500 million for relief.", "", "art2", "ap");
        let numeric = claims.iter().find(|c| c.kind == ClaimKind::Numeric).unwrap();
        assert_eq!(numeric.numeric_value, Some(500_000_000.0));
    }

    #[test]
    fn extract_attribution_claim_captures_speaker_and_statement() {
        let extractor = ClaimExtractor::new();
        let claims = extractor.extract_claims(
            "John Smith said that the economy is recovering.",
            "",
            "art3",
            "daily_mirror",
        );
        let attribution = claims.iter().find(|c| c.kind == ClaimKind::Attribution).unwrap();
        assert_eq!(attribution.subject, "John Smith");
        assert_eq!(attribution.predicate, "said");
    }

    #[test]
    fn extract_event_claim_captures_event_and_location() {
        let extractor = ClaimExtractor::new();
        let claims = extractor.extract_claims("Flooding hit Colombo overnight.", "", "art4", "ada_derana");
        let event = claims.iter().find(|c| c.kind == ClaimKind::Event).unwrap();
        assert_eq!(event.object, "Colombo");
    }

    #[test]
    fn find_matching_claims_skips_same_article() {
        let extractor = ClaimExtractor::new();
        let claims_a = extractor.extract_claims("Inflation increased by 12 percent.", "", "art1", "reuters");
        let claims_b = extractor.extract_claims("Inflation increased by 12 percent.", "", "art1", "reuters");
        let matches = find_matching_claims(&claims_a[0], &claims_b, 0.8);
        assert!(matches.is_empty());
    }

    #[test]
    fn find_matching_claims_numeric_similarity_threshold() {
        let extractor = ClaimExtractor::new();
        let a = extractor.extract_claims("Inflation increased by 12 percent.", "", "art1", "reuters");
        let b = extractor.extract_claims("Inflation increased by 12.5 percent.", "", "art2", "ap");
        let matches = find_matching_claims(&a[0], &b, 0.8);
        assert!(!matches.is_empty());
        assert!(matches[0].1 >= 0.8);
    }

    #[test]
    fn extract_entities_finds_money_and_percentage() {
        let entities = extract_entities("The CBSL reported Rs. 500 million in losses, a 12% drop.");
        assert!(entities.iter().any(|e| e.kind == EntityKind::Organization));
        assert!(entities.iter().any(|e| e.kind == EntityKind::Money));
        assert!(entities.iter().any(|e| e.kind == EntityKind::Percentage));
    }

    #[test]
    fn jaccard_similarity_identical_texts_is_one() {
        assert_eq!(jaccard_similarity("a b c", "a b c"), 1.0);
    }

    #[test]
    fn jaccard_similarity_disjoint_texts_is_zero() {
        assert_eq!(jaccard_similarity("a b c", "d e f"), 0.0);
    }
}
