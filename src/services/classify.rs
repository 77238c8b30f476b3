// src/services/classify.rs

//! Keyword classification of notice categories.
//!
//! Exchanges label notices with free-form Korean categories. These are mapped
//! onto [`NoticeType`] by an ordered keyword table; the first rule whose keyword
//! occurs in the normalized text wins, so the order below is significant.

use crate::models::NoticeType;
use crate::utils::normalize_whitespace;

struct Rule {
    notice_type: NoticeType,
    keywords: &'static [&'static str],
}

const RULES: &[Rule] = &[
    Rule {
        notice_type: NoticeType::TradingEnd,
        keywords: &["거래지원종료"],
    },
    Rule {
        notice_type: NoticeType::Caution,
        keywords: &["거래유의", "유의"],
    },
    Rule {
        notice_type: NoticeType::DepositWithdraw,
        keywords: &["입출금"],
    },
    Rule {
        notice_type: NoticeType::Maintenance,
        keywords: &["점검"],
    },
    Rule {
        notice_type: NoticeType::Fee,
        keywords: &["수수료"],
    },
    Rule {
        notice_type: NoticeType::Disclosure,
        keywords: &["공시"],
    },
    Rule {
        notice_type: NoticeType::Security,
        keywords: &["보안"],
    },
    Rule {
        notice_type: NoticeType::ServiceUpdate,
        keywords: &["업데이트", "신규서비스", "서비스+", "서비스"],
    },
    Rule {
        notice_type: NoticeType::Insight,
        keywords: &["인사이트"],
    },
    Rule {
        notice_type: NoticeType::TradingSupport,
        keywords: &["거래지원", "거래", "디지털자산", "nft", "web3", "마켓 추가", "신규"],
    },
    Rule {
        notice_type: NoticeType::Event,
        keywords: &["이벤트", "당첨자발표", "후기"],
    },
    Rule {
        notice_type: NoticeType::General,
        keywords: &["공지사항", "공지", "안내", "중요"],
    },
];

/// Classify a single category label.
pub fn classify_text(text: &str) -> NoticeType {
    let normalized = normalize_whitespace(&text.to_lowercase());
    if normalized.is_empty() {
        return NoticeType::Other;
    }

    RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| normalized.contains(k)))
        .map(|rule| rule.notice_type)
        .unwrap_or(NoticeType::Other)
}

/// Classify by the first category of a list.
pub fn classify_categories(categories: &[String]) -> NoticeType {
    categories
        .first()
        .map(|c| classify_text(c))
        .unwrap_or(NoticeType::Other)
}

/// Map Gopax's numeric notice type.
pub fn classify_gopax_type(code: Option<i64>) -> NoticeType {
    match code {
        None | Some(1) => NoticeType::General,
        Some(2) => NoticeType::TradingSupport,
        Some(3) => NoticeType::Event,
        Some(4) => NoticeType::DepositWithdraw,
        Some(_) => NoticeType::Other,
    }
}

/// Trim, collapse whitespace, drop blanks and repeats (first occurrence wins).
pub fn normalize_categories<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut categories: Vec<String> = Vec::new();
    for value in raw {
        let category = normalize_whitespace(value.as_ref());
        if !category.is_empty() && !categories.contains(&category) {
            categories.push(category);
        }
    }
    categories
}

/// Serialize categories as a JSON array string, `"[]"` if that fails.
pub fn to_categories_json(categories: &[String]) -> String {
    serde_json::to_string(categories).unwrap_or_else(|e| {
        log::warn!("Category serialization failed: {}", e);
        "[]".to_string()
    })
}
