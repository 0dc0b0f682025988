//! Keyword classifier for submissions.
//!
//! Scores the text against weighted phrase tables per category and adds a
//! few structural signals (chat transcripts, currency amounts). The highest
//! score wins; ties go to the category declared first in
//! [`ContentCategory::ALL`]. No signal at all falls back to
//! `Conversation` with zero confidence.

use std::collections::HashMap;

use redflag_types::analysis::{Classification, ContentCategory};

/// Occurrences of a single phrase beyond this are ignored.
const MAX_HITS_PER_PHRASE: u32 = 3;

const DATING: &[(&str, u32)] = &[
    ("dating", 3),
    ("tinder", 3),
    ("bumble", 3),
    ("hinge", 3),
    ("swipe", 2),
    ("soulmate", 3),
    ("looking for", 1),
    ("single", 1),
    ("relationship", 2),
    ("about me", 2),
    ("my type", 2),
    ("zodiac", 2),
    ("hobbies", 1),
    ("partner", 1),
    ("girlfriend", 2),
    ("boyfriend", 2),
    ("sugar daddy", 3),
    ("sugar baby", 3),
    ("widower", 2),
    ("oil rig", 2),
    ("ltr", 2),
    ("hookup", 2),
    ("fwb", 2),
    ("height", 1),
    ("bio", 1),
];

const CONVERSATION: &[(&str, u32)] = &[
    ("lol", 1),
    ("haha", 1),
    ("omg", 1),
    ("miss you", 2),
    ("babe", 2),
    ("honey", 1),
    ("sweetheart", 2),
    ("text me", 2),
    ("call me", 1),
    ("whatsapp", 2),
    ("telegram", 2),
    ("gift card", 2),
    ("send money", 3),
    ("wire", 1),
    ("western union", 3),
    ("bitcoin", 2),
    ("crypto", 1),
    ("emergency", 1),
    ("hospital", 1),
    ("customs", 1),
    ("delivered", 1),
    ("replied", 1),
    ("you said", 2),
    ("i said", 2),
];

const JOB: &[(&str, u32)] = &[
    ("job", 2),
    ("hiring", 3),
    ("position", 2),
    ("salary", 3),
    ("per hour", 2),
    ("hourly", 2),
    ("work from home", 3),
    ("wfh", 2),
    ("remote", 1),
    ("apply", 2),
    ("applicant", 2),
    ("candidate", 2),
    ("resume", 3),
    ("cv", 1),
    ("interview", 2),
    ("experience", 1),
    ("requirements", 1),
    ("responsibilities", 2),
    ("qualifications", 2),
    ("benefits", 1),
    ("full time", 2),
    ("part time", 2),
    ("employer", 2),
    ("recruiter", 3),
    ("onboarding", 2),
    ("training fee", 3),
    ("data entry", 2),
    ("reshipping", 3),
    ("commission", 1),
];

const HOUSING: &[(&str, u32)] = &[
    ("apartment", 3),
    ("rent", 2),
    ("rental", 3),
    ("lease", 3),
    ("landlord", 3),
    ("tenant", 3),
    ("bedroom", 3),
    ("bathroom", 2),
    ("br", 1),
    ("ba", 1),
    ("sq ft", 2),
    ("sqft", 2),
    ("square feet", 2),
    ("security deposit", 3),
    ("utilities", 2),
    ("furnished", 2),
    ("move in", 2),
    ("roommate", 2),
    ("studio", 1),
    ("condo", 2),
    ("parking", 1),
    ("laundry", 1),
    ("viewing", 1),
    ("per month", 1),
    ("property", 1),
];

const MARKETPLACE: &[(&str, u32)] = &[
    ("for sale", 3),
    ("selling", 2),
    ("price", 1),
    ("obo", 3),
    ("brand new", 2),
    ("condition", 1),
    ("shipping", 2),
    ("local pickup", 3),
    ("pickup", 1),
    ("pick up", 1),
    ("buyer", 2),
    ("seller", 2),
    ("paypal", 1),
    ("venmo", 1),
    ("zelle", 1),
    ("cash app", 1),
    ("cashapp", 1),
    ("firm", 1),
    ("item", 1),
    ("marketplace", 3),
    ("craigslist", 2),
    ("ebay", 2),
    ("warranty", 1),
    ("original packaging", 2),
    ("tickets", 1),
    ("cash only", 2),
];

fn table(category: ContentCategory) -> &'static [(&'static str, u32)] {
    match category {
        ContentCategory::DatingProfile => DATING,
        ContentCategory::Conversation => CONVERSATION,
        ContentCategory::JobPosting => JOB,
        ContentCategory::HousingListing => HOUSING,
        ContentCategory::MarketplaceListing => MARKETPLACE,
    }
}

/// Classify free text into a category.
pub fn classify(text: &str) -> Classification {
    let normalized = normalize(text);
    let mut scores: HashMap<ContentCategory, u32> = HashMap::new();

    for category in ContentCategory::ALL {
        let score = table(category)
            .iter()
            .map(|(phrase, weight)| count_phrase(&normalized, phrase).min(MAX_HITS_PER_PHRASE) * weight)
            .sum::<u32>();
        scores.insert(category, score);
    }

    *scores.entry(ContentCategory::Conversation).or_default() += transcript_signal(text);

    let currency = currency_amounts(text).min(3);
    *scores.entry(ContentCategory::MarketplaceListing).or_default() += currency;
    *scores.entry(ContentCategory::HousingListing).or_default() += currency;

    let ordered: Vec<(ContentCategory, u32)> = ContentCategory::ALL
        .iter()
        .map(|c| (*c, scores.get(c).copied().unwrap_or(0)))
        .collect();

    let total: u32 = ordered.iter().map(|(_, s)| s).sum();
    let mut best = (ContentCategory::Conversation, 0u32);
    for (category, score) in &ordered {
        if *score > best.1 {
            best = (*category, *score);
        }
    }

    let confidence = if total == 0 {
        0.0
    } else {
        best.1 as f32 / total as f32
    };

    Classification {
        category: best.0,
        confidence,
        scores: ordered,
    }
}

/// An explicit user choice wins over the classifier.
pub fn resolve_category(hint: Option<ContentCategory>, text: &str) -> Classification {
    match hint {
        Some(category) => Classification {
            category,
            confidence: 1.0,
            scores: Vec::new(),
        },
        None => classify(text),
    }
}

/// Lowercase, map punctuation to spaces, collapse whitespace and pad with
/// a space on both sides so phrases match on word boundaries.
fn normalize(text: &str) -> String {
    let mapped: String = text
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();
    let mut out = String::with_capacity(mapped.len() + 2);
    out.push(' ');
    for word in mapped.split_whitespace() {
        out.push_str(word);
        out.push(' ');
    }
    out
}

fn count_phrase(normalized: &str, phrase: &str) -> u32 {
    let needle = format!(" {phrase} ");
    let mut count = 0;
    let mut rest = normalized;
    while let Some(pos) = rest.find(&needle) {
        count += 1;
        // Step past the phrase but keep its trailing space for the next match.
        rest = &rest[pos + needle.len() - 1..];
    }
    count
}

/// Scores `Name: message` transcripts. Needs two distinct speakers and at
/// least one repeated speaker so that `Salary: ...` style field lists in
/// postings do not count.
fn transcript_signal(text: &str) -> u32 {
    let mut speakers: HashMap<String, u32> = HashMap::new();
    let mut timestamps = 0u32;

    for line in text.lines() {
        let line = line.trim();
        if let Some(name) = speaker_of(line) {
            *speakers.entry(name.to_lowercase()).or_default() += 1;
        }
        if has_clock_time(line) {
            timestamps += 1;
        }
    }

    let repeated = speakers.values().any(|n| *n >= 2);
    let mut score = 0;
    if speakers.len() >= 2 && repeated {
        let lines: u32 = speakers.values().sum();
        score += (lines * 2).min(10);
    }
    score + timestamps.min(5)
}

fn speaker_of(line: &str) -> Option<&str> {
    let line = line
        .strip_prefix('[')
        .and_then(|rest| rest.split_once(']').map(|(_, after)| after.trim_start()))
        .unwrap_or(line);
    let (name, message) = line.split_once(':')?;
    let name = name.trim();
    if name.is_empty() || message.trim().is_empty() || !message.starts_with(' ') {
        return None;
    }
    if name.split_whitespace().count() > 3 || name.chars().count() > 30 {
        return None;
    }
    if !name.chars().next().is_some_and(char::is_alphabetic) {
        return None;
    }
    Some(name)
}

/// Detects `h:mm` / `hh:mm` clock times.
fn has_clock_time(line: &str) -> bool {
    let bytes = line.as_bytes();
    for i in 1..bytes.len() {
        if bytes[i] != b':' {
            continue;
        }
        let before = bytes[..i].iter().rev().take_while(|b| b.is_ascii_digit()).count();
        let after = bytes[i + 1..].iter().take_while(|b| b.is_ascii_digit()).count();
        if (1..=2).contains(&before) && after == 2 {
            return true;
        }
    }
    false
}

fn currency_amounts(text: &str) -> u32 {
    let chars: Vec<char> = text.chars().collect();
    chars
        .windows(2)
        .filter(|w| matches!(w[0], '$' | '€' | '£') && w[1].is_ascii_digit())
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_posting() {
        let text = "We're hiring! Remote data entry position. Salary: $45 per hour. \
                    No experience needed. Send your resume and pay the $99 training fee to start onboarding.";
        let c = classify(text);
        assert_eq!(c.category, ContentCategory::JobPosting);
        assert!(c.confidence > 0.5);
    }

    #[test]
    fn test_housing_listing() {
        let text = "Spacious 2 bedroom apartment for rent, $900/month. Utilities included, \
                    furnished. Landlord is overseas, wire the security deposit before viewing.";
        assert_eq!(classify(text).category, ContentCategory::HousingListing);
    }

    #[test]
    fn test_marketplace_listing() {
        let text = "PS5 for sale, brand new in original packaging. $250 OBO. \
                    Shipping only, pay with Zelle. Seller is out of town.";
        assert_eq!(classify(text).category, ContentCategory::MarketplaceListing);
    }

    #[test]
    fn test_dating_profile() {
        let text = "About me: widower, engineer on an oil rig. Looking for my soulmate. \
                    Not here for hookups, only a serious relationship. Hobbies: travel, wine.";
        assert_eq!(classify(text).category, ContentCategory::DatingProfile);
    }

    #[test]
    fn test_conversation_transcript() {
        let text = "[10:02] Mark: hey beautiful\n\
                    [10:03] Anna: hi! how are you\n\
                    [10:05] Mark: I'm stuck at customs, can you buy me a gift card?\n\
                    [10:06] Anna: what? why";
        let c = classify(text);
        assert_eq!(c.category, ContentCategory::Conversation);
    }

    #[test]
    fn test_field_list_is_not_transcript() {
        let text = "Location: Remote\nSalary: $5000\nRequirements: none";
        assert_eq!(transcript_signal(text), 0);
    }

    #[test]
    fn test_empty_text_falls_back() {
        let c = classify("   ");
        assert_eq!(c.category, ContentCategory::Conversation);
        assert_eq!(c.confidence, 0.0);
        assert_eq!(c.scores.len(), 5);
    }

    #[test]
    fn test_tie_breaks_by_declaration_order() {
        // "dating" (3) vs "hiring" (3): DatingProfile is declared first.
        let c = classify("dating hiring");
        assert_eq!(c.category, ContentCategory::DatingProfile);
    }

    #[test]
    fn test_phrase_hits_are_capped() {
        let text = "rent ".repeat(50);
        let c = classify(&text);
        let housing = c
            .scores
            .iter()
            .find(|(cat, _)| *cat == ContentCategory::HousingListing)
            .unwrap()
            .1;
        assert_eq!(housing, MAX_HITS_PER_PHRASE * 2);
    }

    #[test]
    fn test_word_boundaries() {
        // "parent" must not match "rent"; "brand" must not match "br".
        let c = classify("parent brand");
        assert!(c.scores.iter().all(|(_, s)| *s == 0));
    }

    #[test]
    fn test_hint_wins() {
        let c = resolve_category(Some(ContentCategory::JobPosting), "2 bedroom apartment for rent");
        assert_eq!(c.category, ContentCategory::JobPosting);
        assert_eq!(c.confidence, 1.0);
    }

    #[test]
    fn test_clock_time_detection() {
        assert!(has_clock_time("at 9:30 pm"));
        assert!(has_clock_time("[10:42]"));
        assert!(!has_clock_time("ratio 1:2"));
        assert!(!has_clock_time("Salary: 5000"));
    }
}
