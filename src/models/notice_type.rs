// src/models/notice_type.rs

//! Fixed notice-type taxonomy shared by every exchange.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical notice type, stored as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i16")]
pub enum NoticeType {
    General,
    TradingSupport,
    TradingEnd,
    Caution,
    DepositWithdraw,
    Maintenance,
    Fee,
    Event,
    Disclosure,
    Security,
    ServiceUpdate,
    Insight,
    #[default]
    Other,
}

impl NoticeType {
    /// Every variant, in code order.
    pub const ALL: [NoticeType; 13] = [
        NoticeType::General,
        NoticeType::TradingSupport,
        NoticeType::TradingEnd,
        NoticeType::Caution,
        NoticeType::DepositWithdraw,
        NoticeType::Maintenance,
        NoticeType::Fee,
        NoticeType::Event,
        NoticeType::Disclosure,
        NoticeType::Security,
        NoticeType::ServiceUpdate,
        NoticeType::Insight,
        NoticeType::Other,
    ];

    /// Stored numeric code.
    pub fn code(self) -> i16 {
        match self {
            NoticeType::General => 1,
            NoticeType::TradingSupport => 2,
            NoticeType::TradingEnd => 3,
            NoticeType::Caution => 4,
            NoticeType::DepositWithdraw => 5,
            NoticeType::Maintenance => 6,
            NoticeType::Fee => 7,
            NoticeType::Event => 8,
            NoticeType::Disclosure => 9,
            NoticeType::Security => 10,
            NoticeType::ServiceUpdate => 11,
            NoticeType::Insight => 12,
            NoticeType::Other => 99,
        }
    }

    /// Look up a variant by its stored code.
    pub fn from_code(code: i16) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    fn as_str(self) -> &'static str {
        match self {
            NoticeType::General => "general",
            NoticeType::TradingSupport => "trading_support",
            NoticeType::TradingEnd => "trading_end",
            NoticeType::Caution => "caution",
            NoticeType::DepositWithdraw => "deposit_withdraw",
            NoticeType::Maintenance => "maintenance",
            NoticeType::Fee => "fee",
            NoticeType::Event => "event",
            NoticeType::Disclosure => "disclosure",
            NoticeType::Security => "security",
            NoticeType::ServiceUpdate => "service_update",
            NoticeType::Insight => "insight",
            NoticeType::Other => "other",
        }
    }
}

impl From<NoticeType> for i16 {
    fn from(value: NoticeType) -> Self {
        value.code()
    }
}

impl TryFrom<i16> for NoticeType {
    type Error = String;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("unknown notice type code {code}"))
    }
}

impl fmt::Display for NoticeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
