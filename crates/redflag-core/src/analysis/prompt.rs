//! Prompt construction for red flag analysis.
//!
//! The system prompt fixes the model's role, gives a category-specific
//! checklist, and pins the exact JSON shape `parser::parse_analysis`
//! expects back.

use redflag_types::analysis::ContentCategory;

const RESPONSE_SHAPE: &str = r#"Respond with a single JSON object and nothing else:
{
  "category": "dating_profile | conversation | job_posting | housing_listing | marketplace_listing",
  "risk_score": <integer 0-100>,
  "risk_level": "low | medium | high | critical",
  "summary": "<two or three sentences>",
  "red_flags": [
    {"title": "<short name>", "description": "<why it matters>", "severity": "low | medium | high", "evidence": "<exact quote or null>"}
  ],
  "green_flags": ["<reassuring signal>"],
  "recommendations": ["<concrete next step>"]
}"#;

fn checklist(category: ContentCategory) -> &'static str {
    match category {
        ContentCategory::DatingProfile => {
            "- Photos that look professional, stock, or inconsistent with each other\n\
             - Claims of overseas work (military, oil rig, contractor) or recent widowhood\n\
             - Pushing to move off the platform quickly (WhatsApp, Telegram, email)\n\
             - Vague or copy-pasted bio, grand romantic language, love-bombing\n\
             - Mentions of money, investing, crypto, or sugar arrangements"
        }
        ContentCategory::Conversation => {
            "- Requests for money, gift cards, crypto, or wire transfers\n\
             - Sudden emergencies (hospital, customs, stranded travel)\n\
             - Pressure, urgency, guilt, or threats\n\
             - Avoiding calls or video; excuses for never meeting\n\
             - Investment or trading opportunities; requests for codes or passwords\n\
             - Controlling, isolating, or manipulative language"
        }
        ContentCategory::JobPosting => {
            "- Upfront fees for training, equipment, or background checks\n\
             - Pay far above market for little or no experience\n\
             - Interviews only over chat apps; no verifiable company details\n\
             - Check-cashing, reshipping, or package-forwarding duties\n\
             - Requests for bank details or ID before an offer\n\
             - Generic email domains for a supposed corporate recruiter"
        }
        ContentCategory::HousingListing => {
            "- Rent well below comparable listings\n\
             - Landlord unavailable to show the property (abroad, travelling)\n\
             - Deposit or first month requested before a viewing or lease\n\
             - Payment by wire, gift card, crypto, or payment apps only\n\
             - Photos copied from other listings; address withheld\n\
             - Pressure to decide immediately because of other applicants"
        }
        ContentCategory::MarketplaceListing => {
            "- Price far below market value for the item\n\
             - Shipping only, refusal to meet or allow inspection\n\
             - Irreversible payment methods or overpayment schemes\n\
             - Stock photos, no serial numbers, vague condition\n\
             - Seller account that is new or has no history\n\
             - Links to pay outside the platform"
        }
    }
}

/// Build the system prompt for a category.
pub fn system_prompt(category: ContentCategory) -> String {
    format!(
        "You are Red Flag Detector, a careful safety analyst. Users send you content \
         they are unsure about and you assess how risky it is.\n\
         \n\
         The content appears to be a {label}. If it is clearly a different kind of content, \
         say so by setting \"category\" accordingly and analyze it as that kind.\n\
         \n\
         Look in particular for:\n\
         {checklist}\n\
         \n\
         Rules:\n\
         - Base every red flag on something actually present in the content; quote it as evidence.\n\
         - Mention genuine reassuring signals as green flags; do not invent them.\n\
         - Scores: 0-24 low, 25-49 medium, 50-74 high, 75-100 critical.\n\
         - Be direct and practical; no moralizing.\n\
         \n\
         {shape}",
        label = category.label().to_lowercase(),
        checklist = checklist(category),
        shape = RESPONSE_SHAPE,
    )
}

/// Frame the user's submission.
pub fn user_prompt(text: &str, attachment_names: &[String]) -> String {
    let mut prompt = String::new();
    let text = text.trim();

    if text.is_empty() {
        prompt.push_str("No text was provided; analyze the attached files only.\n");
    } else {
        prompt.push_str("Content to analyze:\n<<<\n");
        prompt.push_str(text);
        prompt.push_str("\n>>>\n");
    }

    if !attachment_names.is_empty() {
        prompt.push_str("\nAttached files (screenshots, photos or documents):\n");
        for name in attachment_names {
            prompt.push_str("- ");
            prompt.push_str(name);
            prompt.push('\n');
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_mentions_category_and_shape() {
        let prompt = system_prompt(ContentCategory::HousingListing);
        assert!(prompt.contains("housing listing"));
        assert!(prompt.contains("before a viewing"));
        assert!(prompt.contains("\"risk_score\""));
        assert!(prompt.contains("\"red_flags\""));
    }

    #[test]
    fn test_each_category_has_distinct_checklist() {
        let prompts: Vec<String> = ContentCategory::ALL.iter().map(|c| system_prompt(*c)).collect();
        for (i, a) in prompts.iter().enumerate() {
            for b in prompts.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_user_prompt_with_text_and_files() {
        let prompt = user_prompt("  Send $500 now  ", &["chat.png".to_string()]);
        assert!(prompt.contains("<<<\nSend $500 now\n>>>"));
        assert!(prompt.contains("- chat.png"));
    }

    #[test]
    fn test_user_prompt_files_only() {
        let prompt = user_prompt("", &["listing.pdf".to_string()]);
        assert!(prompt.starts_with("No text was provided"));
        assert!(!prompt.contains("<<<"));
    }
}
