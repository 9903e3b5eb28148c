//! Payment-card records and input validation.
//!
//! Card fields arrive from the console one at a time; each `parse_*`
//! function validates a single raw input so the prompt can re-ask right
//! away.  Sensitive strings are wiped when a card is dropped.

use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{Result, WalletCacheError};

/// Longest accepted card nickname.
pub const MAX_NAME_LEN: usize = 32;

/// How far ahead an expiration year may be.
const MAX_YEARS_AHEAD: i32 = 20;

/// A stored card.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Card {
    pub id: u32,
    pub name: Option<String>,
    pub number: String,
    pub cvv: String,
    pub month: u8,
    pub year: u16,
    #[zeroize(skip)]
    pub added_at: DateTime<Utc>,
}

// Never print the number or cvv, even in debug logs.
impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Card")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("number", &self.masked_number())
            .field("added_at", &self.added_at)
            .finish_non_exhaustive()
    }
}

/// A card as typed by the user, before validation.
///
/// Call `zeroize()` once the card has been built.
#[derive(Default, Zeroize)]
pub struct NewCard {
    pub name: String,
    pub number: String,
    pub cvv: String,
    pub month: String,
    pub year: String,
}

impl NewCard {
    /// Validate every field and build a [`Card`] with the given id.
    pub fn to_card(&self, id: u32, now: DateTime<Utc>) -> Result<Card> {
        let number = parse_number(&self.number)?;
        let cvv = parse_cvv(&self.cvv)?;
        let month = parse_month(&self.month)?;
        let year = parse_year(&self.year, now.year())?;
        let name = parse_name(&self.name)?;

        if i32::from(year) == now.year() && u32::from(month) < now.month() {
            return Err(WalletCacheError::InvalidCard(
                "card has already expired".into(),
            ));
        }

        Ok(Card {
            id,
            name,
            number,
            cvv,
            month,
            year,
            added_at: now,
        })
    }
}

/// One displayable field of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardField {
    Name,
    Number,
    Expiration,
    Cvv,
}

impl CardField {
    pub const ALL: [CardField; 4] = [Self::Name, Self::Number, Self::Expiration, Self::Cvv];

    pub fn label(self) -> &'static str {
        match self {
            Self::Name => "Name: ",
            Self::Number => "Number: ",
            Self::Expiration => "Expiration: ",
            Self::Cvv => "CVV: ",
        }
    }

    /// Hidden unless the user toggles visibility.
    pub fn is_sensitive(self) -> bool {
        !matches!(self, Self::Name)
    }
}

/// Id and display label of a card, for menus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSummary {
    pub id: u32,
    pub label: String,
}

impl Card {
    /// Last four digits of the number.
    pub fn last_four(&self) -> &str {
        let start = self.number.len().saturating_sub(4);
        &self.number[start..]
    }

    /// `**** 1234`
    pub fn masked_number(&self) -> String {
        format!("**** {}", self.last_four())
    }

    /// The nickname, or `Card ending 1234`.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("Card ending {}", self.last_four()),
        }
    }

    /// `MM/YYYY`
    pub fn expiration(&self) -> String {
        format!("{:02}/{}", self.month, self.year)
    }

    pub fn field_value(&self, field: CardField) -> String {
        match field {
            CardField::Name => self.name.clone().unwrap_or_default(),
            CardField::Number => self.number.clone(),
            CardField::Expiration => self.expiration(),
            CardField::Cvv => self.cvv.clone(),
        }
    }

    pub fn summary(&self) -> CardSummary {
        CardSummary {
            id: self.id,
            label: self.label(),
        }
    }
}

// ---------------------------------------------------------------------------
// Field validation
// ---------------------------------------------------------------------------

/// Digits only, spaces and hyphens ignored, 12–19 digits, valid Luhn sum.
pub fn parse_number(input: &str) -> Result<String> {
    let digits: String = input
        .chars()
        .filter(|c| !matches!(c, ' ' | '-'))
        .collect();

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(WalletCacheError::InvalidCard(
            "card number may only contain digits".into(),
        ));
    }
    if !(12..=19).contains(&digits.len()) {
        return Err(WalletCacheError::InvalidCard(
            "card number must be 12 to 19 digits long".into(),
        ));
    }
    if !luhn_valid(&digits) {
        return Err(WalletCacheError::InvalidCard(
            "card number failed the checksum, check for typos".into(),
        ));
    }
    Ok(digits)
}

pub fn parse_cvv(input: &str) -> Result<String> {
    let cvv = input.trim();
    if !(3..=4).contains(&cvv.len()) || !cvv.bytes().all(|b| b.is_ascii_digit()) {
        return Err(WalletCacheError::InvalidCard(
            "cvv must be 3 or 4 digits".into(),
        ));
    }
    Ok(cvv.to_string())
}

pub fn parse_month(input: &str) -> Result<u8> {
    match input.trim().parse::<u8>() {
        Ok(month @ 1..=12) => Ok(month),
        _ => Err(WalletCacheError::InvalidCard(
            "month must be a number from 1 to 12".into(),
        )),
    }
}

/// A four-digit year from `current_year` up to 20 years ahead.
pub fn parse_year(input: &str, current_year: i32) -> Result<u16> {
    let trimmed = input.trim();
    let year = trimmed
        .parse::<u16>()
        .ok()
        .filter(|_| trimmed.len() == 4)
        .ok_or_else(|| WalletCacheError::InvalidCard("year must have four digits".into()))?;

    let as_i32 = i32::from(year);
    if as_i32 < current_year || as_i32 > current_year + MAX_YEARS_AHEAD {
        return Err(WalletCacheError::InvalidCard(format!(
            "year must be between {current_year} and {}",
            current_year + MAX_YEARS_AHEAD
        )));
    }
    Ok(year)
}

/// Optional nickname: letters, digits and spaces only.
pub fn parse_name(input: &str) -> Result<Option<String>> {
    let name = input.trim();
    if name.is_empty() {
        return Ok(None);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(WalletCacheError::InvalidCard(format!(
            "card name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c == ' ') {
        return Err(WalletCacheError::InvalidCard(
            "card name may only contain letters, numbers and spaces".into(),
        ));
    }
    Ok(Some(name.to_string()))
}

fn luhn_valid(digits: &str) -> bool {
    let sum: u32 = digits
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let d = u32::from(b - b'0');
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}
