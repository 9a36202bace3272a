//! Answer-in-progress state and item navigation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ExamError;
use crate::model::OptionKey;

/// The user's chosen option per item number. Only the user writes to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseLedger {
    item_count: u32,
    answers: BTreeMap<u32, OptionKey>,
}

impl ResponseLedger {
    /// An empty ledger for items numbered `1..=item_count`.
    pub fn new(item_count: usize) -> Self {
        Self {
            item_count: item_count as u32,
            answers: BTreeMap::new(),
        }
    }

    fn check(&self, number: u32) -> Result<(), ExamError> {
        if number == 0 || number > self.item_count {
            Err(ExamError::UnknownItem(number))
        } else {
            Ok(())
        }
    }

    /// Record (or replace) the choice for an item.
    pub fn set(&mut self, number: u32, option: OptionKey) -> Result<(), ExamError> {
        self.check(number)?;
        self.answers.insert(number, option);
        Ok(())
    }

    /// Unset the choice for an item. Clearing an unanswered item is a no-op.
    pub fn clear(&mut self, number: u32) -> Result<(), ExamError> {
        self.check(number)?;
        self.answers.remove(&number);
        Ok(())
    }

    pub fn get(&self, number: u32) -> Option<OptionKey> {
        self.answers.get(&number).copied()
    }

    pub fn item_count(&self) -> usize {
        self.item_count as usize
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn unanswered_count(&self) -> usize {
        self.item_count() - self.answered_count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, OptionKey)> + '_ {
        self.answers.iter().map(|(n, o)| (*n, *o))
    }
}

/// Which item is on screen. Moving never checks whether items are answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    current: u32,
    last: u32,
}

impl Cursor {
    pub fn new(item_count: usize) -> Self {
        Self {
            current: 1,
            last: item_count as u32,
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn go_to(&mut self, number: u32) -> Result<u32, ExamError> {
        if number == 0 || number > self.last {
            return Err(ExamError::UnknownItem(number));
        }
        self.current = number;
        Ok(self.current)
    }

    /// Advance one item, staying on the last one.
    pub fn next(&mut self) -> u32 {
        if self.current < self.last {
            self.current += 1;
        }
        self.current
    }

    /// Step back one item, staying on the first one.
    pub fn previous(&mut self) -> u32 {
        if self.current > 1 {
            self.current -= 1;
        }
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replace_and_clear() {
        let mut ledger = ResponseLedger::new(3);
        ledger.set(2, OptionKey::A).unwrap();
        ledger.set(2, OptionKey::E).unwrap();
        assert_eq!(ledger.get(2), Some(OptionKey::E));
        assert_eq!(ledger.answered_count(), 1);
        assert_eq!(ledger.unanswered_count(), 2);

        ledger.clear(2).unwrap();
        assert_eq!(ledger.get(2), None);
        assert_eq!(ledger.unanswered_count(), 3);
    }

    #[test]
    fn keys_stay_within_item_numbers() {
        let mut ledger = ResponseLedger::new(10);
        assert!(matches!(
            ledger.set(0, OptionKey::A),
            Err(ExamError::UnknownItem(0))
        ));
        assert!(matches!(
            ledger.set(11, OptionKey::A),
            Err(ExamError::UnknownItem(11))
        ));
        assert!(ledger.clear(42).is_err());
        assert_eq!(ledger.answered_count(), 0);
    }

    #[test]
    fn cursor_saturates_at_both_ends() {
        let mut cursor = Cursor::new(3);
        assert_eq!(cursor.current(), 1);
        assert_eq!(cursor.previous(), 1);
        assert_eq!(cursor.next(), 2);
        assert_eq!(cursor.next(), 3);
        assert_eq!(cursor.current(), 3);
    }

    #[test]
    fn cursor_go_to_validates_range() {
        let mut cursor = Cursor::new(20);
        assert_eq!(cursor.go_to(17).unwrap(), 17);
        assert!(cursor.go_to(21).is_err());
        assert_eq!(cursor.current(), 17);
    }
}
