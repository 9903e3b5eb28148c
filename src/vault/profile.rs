//! The decrypted profile: everything that goes inside the sealed payload.

use serde::{Deserialize, Serialize};

use super::card::{Card, CardSummary};

/// Cards plus the id counter, serialized as JSON before encryption.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    /// Next id to hand out.  Ids are never reused.
    next_id: u32,
    cards: Vec<Card>,
}

impl Profile {
    /// The id the next call to `allocate_id` returns.
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    /// Reserve the next card id.
    pub fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn insert(&mut self, card: Card) {
        self.cards.push(card);
    }

    /// Remove a card, returning whether it existed.
    pub fn remove(&mut self, id: u32) -> bool {
        let before = self.cards.len();
        self.cards.retain(|c| c.id != id);
        self.cards.len() != before
    }

    pub fn get(&self, id: u32) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    /// Summaries sorted by id (insertion order).
    pub fn summaries(&self) -> Vec<CardSummary> {
        let mut list: Vec<CardSummary> = self.cards.iter().map(Card::summary).collect();
        list.sort_by_key(|s| s.id);
        list
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
