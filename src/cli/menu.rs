//! Interactive menus for the console session.
//!
//! Every screen starts with [`Ui::begin_screen`], which clears the
//! terminal (when enabled) and prints the notices queued by the previous
//! action.  Menu entries are built by small pure functions so the
//! wording and ordering can be tested without a terminal.

use chrono::{Datelike, Utc};
use console::{style, Term};
use dialoguer::{Confirm, Input, Select};
use zeroize::Zeroize;

use crate::cli::output;
use crate::errors::{Result, WalletCacheError};
use crate::vault::card::{self, Card, CardField, CardSummary, NewCard};

/// Typing this at any card prompt cancels the operation.
pub const CANCEL_INPUT: &str = "0";

/// Shown instead of a hidden field value.
const HIDDEN: &str = "****";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartChoice {
    Exit,
    CreateProfile,
    Login,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileChoice {
    Exit,
    List,
    Add,
    Delete,
}

/// What the user picked on the card info screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardAction {
    Return,
    Delete,
    ToggleVisibility,
    Copy(CardField),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Notice {
    Success(String),
    Warning(String),
    Error(String),
}

/// Terminal state shared by every screen of a session.
pub struct Ui {
    term: Term,
    clear_screen: bool,
    notices: Vec<Notice>,
}

impl Ui {
    pub fn new(clear_screen: bool) -> Self {
        Self {
            term: Term::stdout(),
            clear_screen,
            notices: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Notices carried over to the next screen
    // ------------------------------------------------------------------

    pub fn notify_success(&mut self, msg: impl Into<String>) {
        self.notices.push(Notice::Success(msg.into()));
    }

    pub fn notify_warning(&mut self, msg: impl Into<String>) {
        self.notices.push(Notice::Warning(msg.into()));
    }

    pub fn notify_error(&mut self, msg: impl Into<String>) {
        self.notices.push(Notice::Error(msg.into()));
    }

    /// Clear the terminal, print `title` and flush pending notices.
    pub fn begin_screen(&mut self, title: &str) {
        if self.clear_screen {
            // A terminal that cannot be cleared just scrolls.
            let _ = self.term.clear_screen();
        }
        println!("{}", style(title).bold().underlined());
        for notice in self.notices.drain(..) {
            match notice {
                Notice::Success(msg) => output::success(&msg),
                Notice::Warning(msg) => output::warning(&msg),
                Notice::Error(msg) => output::error(&msg),
            }
        }
        println!();
    }

    /// Shown while Argon2 runs, which takes a noticeable moment.
    pub fn display_hashing(&self) {
        output::info("Deriving key from password, please wait...");
    }

    // ------------------------------------------------------------------
    // Menus
    // ------------------------------------------------------------------

    pub fn start_menu(&mut self, profile_exists: bool) -> Result<StartChoice> {
        self.begin_screen("WalletCache");
        let items = start_items(profile_exists);
        let idx = self.select("Choose an option", &labels(&items))?;
        Ok(items[idx].1)
    }

    pub fn profile_menu(&mut self, card_count: usize) -> Result<ProfileChoice> {
        self.begin_screen(&format!("Profile ({card_count} cards)"));
        let items = profile_items();
        let idx = self.select("Choose an option", &labels(&items))?;
        Ok(items[idx].1)
    }

    /// Pick a card.  `None` means the user chose to go back.
    pub fn card_list_menu(&mut self, title: &str, cards: &[CardSummary]) -> Result<Option<u32>> {
        self.begin_screen(title);
        if cards.is_empty() {
            output::tip("No cards saved yet. Use \"Add card\" to store one.");
            println!();
        }
        let items = card_list_items(cards);
        let idx = self.select("Select a card", &labels(&items))?;
        Ok(items[idx].1)
    }

    pub fn card_info_menu(&mut self, card: &Card, visible: bool) -> Result<CardAction> {
        self.begin_screen(&card.label());
        let items = card_info_items(card, visible);
        let idx = self.select("Select a field to copy it", &labels(&items))?;
        Ok(items[idx].1)
    }

    /// Ask before deleting `card`.
    pub fn confirm_delete(&self, card: &Card) -> Result<bool> {
        Confirm::new()
            .with_prompt(format!("Delete {} ({})?", card.label(), card.masked_number()))
            .default(false)
            .interact_on(&self.term)
            .map_err(|e| WalletCacheError::CommandFailed(format!("confirmation prompt: {e}")))
    }

    /// Prompt for every field of a new card.  `None` if the user cancelled.
    ///
    /// Each answer is validated on the spot so a typo only re-asks that
    /// one field.
    pub fn prompt_new_card(&mut self) -> Result<Option<NewCard>> {
        self.begin_screen("Add card");
        output::tip(&format!("Enter {CANCEL_INPUT} at any prompt to cancel."));
        println!();

        let current_year = Utc::now().year();
        let mut input = NewCard::default();

        let Some(number) = self.prompt_field("Card number", |s| card::parse_number(s).map(drop))?
        else {
            return Ok(None);
        };
        input.number = number;

        let Some(month) = self.prompt_field("Expiration month (1-12)", |s| {
            card::parse_month(s).map(drop)
        })?
        else {
            input.zeroize();
            return Ok(None);
        };
        input.month = month;

        let Some(year) = self.prompt_field("Expiration year (YYYY)", move |s| {
            card::parse_year(s, current_year).map(drop)
        })?
        else {
            input.zeroize();
            return Ok(None);
        };
        input.year = year;

        let Some(cvv) = self.prompt_field("CVV", |s| card::parse_cvv(s).map(drop))? else {
            input.zeroize();
            return Ok(None);
        };
        input.cvv = cvv;

        let Some(name) = self.prompt_optional_field("Name (optional)", |s| {
            card::parse_name(s).map(drop)
        })?
        else {
            input.zeroize();
            return Ok(None);
        };
        input.name = name;

        Ok(Some(input))
    }

    // ------------------------------------------------------------------
    // Prompt plumbing
    // ------------------------------------------------------------------

    fn select(&self, prompt: &str, items: &[String]) -> Result<usize> {
        Select::new()
            .with_prompt(prompt)
            .items(items)
            .default(0)
            .interact_on(&self.term)
            .map_err(|e| WalletCacheError::CommandFailed(format!("menu: {e}")))
    }

    fn prompt_field<V>(&self, prompt: &str, validate: V) -> Result<Option<String>>
    where
        V: Fn(&str) -> Result<()>,
    {
        self.prompt_with(prompt, false, validate)
    }

    fn prompt_optional_field<V>(&self, prompt: &str, validate: V) -> Result<Option<String>>
    where
        V: Fn(&str) -> Result<()>,
    {
        self.prompt_with(prompt, true, validate)
    }

    fn prompt_with<V>(&self, prompt: &str, allow_empty: bool, validate: V) -> Result<Option<String>>
    where
        V: Fn(&str) -> Result<()>,
    {
        let answer: String = Input::new()
            .with_prompt(prompt)
            .allow_empty(allow_empty)
            .validate_with(|s: &String| -> std::result::Result<(), String> {
                if is_cancel(s) {
                    return Ok(());
                }
                validate(s.as_str()).map_err(|e| e.to_string())
            })
            .interact_text_on(&self.term)
            .map_err(|e| WalletCacheError::CommandFailed(format!("input prompt: {e}")))?;

        if is_cancel(&answer) {
            return Ok(None);
        }
        Ok(Some(answer))
    }
}

// ---------------------------------------------------------------------------
// Menu contents
// ---------------------------------------------------------------------------

/// `true` if `input` is the cancel answer.
pub fn is_cancel(input: &str) -> bool {
    input.trim() == CANCEL_INPUT
}

/// Login is only offered once a profile exists.
pub fn start_items(profile_exists: bool) -> Vec<(String, StartChoice)> {
    let mut items = vec![
        ("Exit".to_string(), StartChoice::Exit),
        ("Create new profile".to_string(), StartChoice::CreateProfile),
    ];
    if profile_exists {
        items.push(("Login".to_string(), StartChoice::Login));
    }
    items
}

pub fn profile_items() -> Vec<(String, ProfileChoice)> {
    vec![
        ("Exit".to_string(), ProfileChoice::Exit),
        ("List cards".to_string(), ProfileChoice::List),
        ("Add card".to_string(), ProfileChoice::Add),
        ("Delete card".to_string(), ProfileChoice::Delete),
    ]
}

pub fn card_list_items(cards: &[CardSummary]) -> Vec<(String, Option<u32>)> {
    std::iter::once(("Return".to_string(), None))
        .chain(cards.iter().map(|c| (c.label.clone(), Some(c.id))))
        .collect()
}

/// `Name: Travel`, `Number: ****` ... followed by the copy hint.
pub fn card_info_items(card: &Card, visible: bool) -> Vec<(String, CardAction)> {
    let toggle = if visible { "Hide values" } else { "Show values" };
    let mut items = vec![
        ("Return".to_string(), CardAction::Return),
        ("Delete card".to_string(), CardAction::Delete),
        (toggle.to_string(), CardAction::ToggleVisibility),
    ];
    items.extend(CardField::ALL.iter().map(|&field| {
        (
            format!("{}{}", field.label(), field_display(card, field, visible)),
            CardAction::Copy(field),
        )
    }));
    items
}

/// The value to show for `field`, masked unless `visible`.
pub fn field_display(card: &Card, field: CardField, visible: bool) -> String {
    if field.is_sensitive() && !visible {
        return HIDDEN.to_string();
    }
    let value = card.field_value(field);
    if value.is_empty() {
        "-".to_string()
    } else {
        value
    }
}

fn labels<T>(items: &[(String, T)]) -> Vec<String> {
    items.iter().map(|(label, _)| label.clone()).collect()
}
