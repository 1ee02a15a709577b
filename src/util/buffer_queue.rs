//! The Character Source: a queue of owned string chunks presenting one
//! logical, reconsumable character stream to the tokenizer.
//!
//! Chunk slicing goes through safe `StrTendril` construction from `&str`
//! rather than unsafe in-place subtendril/pop-front operations, trading a
//! little throughput for staying entirely in safe Rust.

use std::collections::VecDeque;

use tendril::StrTendril;

use crate::util::smallcharset::SmallCharSet;

/// Result of [`BufferQueue::pop_except_from`].
#[derive(PartialEq, Eq, Debug)]
pub enum SetResult {
    /// The very next character is a member of the set.
    FromSet(char),
    /// A run of one or more characters, none of which are in the set.
    NotFromSet(StrTendril),
}

pub use SetResult::{FromSet, NotFromSet};

/// A queue of owned string buffers, supporting single-character lookahead,
/// single-character unconsumption, and efficient consumption of runs of
/// characters outside a small set.
#[derive(Debug)]
pub struct BufferQueue {
    buffers: VecDeque<StrTendril>,
}

impl Default for BufferQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferQueue {
    pub fn new() -> BufferQueue {
        BufferQueue {
            buffers: VecDeque::new(),
        }
    }

    /// Is the queue empty of buffered characters? (An empty queue does not by
    /// itself mean the underlying stream has reached EOF — that is tracked
    /// separately by the tokenizer's `at_eof` flag.)
    pub fn is_empty(&self) -> bool {
        self.buffers.iter().all(|b| b.is_empty())
    }

    fn drop_empty_front(&mut self) {
        while matches!(self.buffers.front(), Some(b) if b.is_empty()) {
            self.buffers.pop_front();
        }
    }

    /// Add a new chunk to the end of the queue.
    pub fn push_back(&mut self, buf: StrTendril) {
        if !buf.is_empty() {
            self.buffers.push_back(buf);
        }
    }

    /// Push a chunk back onto the front of the queue, e.g. to reconsume
    /// characters already read.
    pub fn push_front(&mut self, buf: StrTendril) {
        if !buf.is_empty() {
            self.buffers.push_front(buf);
        }
    }

    /// Look at the next character without consuming it.
    pub fn peek(&mut self) -> Option<char> {
        self.drop_empty_front();
        self.buffers.front().map(|b| b.chars().next().unwrap())
    }

    /// Consume and return the next character.
    pub fn next(&mut self) -> Option<char> {
        self.drop_empty_front();
        let (c, remaining_len) = match self.buffers.front() {
            None => return None,
            Some(b) => {
                let c = b.chars().next().unwrap();
                (c, b.len() - c.len_utf8())
            }
        };

        if remaining_len == 0 {
            self.buffers.pop_front();
        } else {
            let front = self.buffers.front_mut().unwrap();
            *front = StrTendril::from_slice(&front[c.len_utf8()..]);
        }
        Some(c)
    }

    /// Consume either a single character from `set`, or the longest possible
    /// run of characters none of which are in `set`.
    pub fn pop_except_from(&mut self, set: SmallCharSet) -> Option<SetResult> {
        self.drop_empty_front();
        let n = match self.buffers.front() {
            None => return None,
            Some(b) => set.nonmember_prefix_len(b),
        };

        let buf = self.buffers.front().unwrap();
        if n == 0 {
            if buf.is_empty() {
                return None;
            }
            let c = buf.chars().next().unwrap();
            return Some(FromSet(self.next().map(|_| c).unwrap()));
        }

        let n = n as usize;
        if n >= buf.len() {
            let out = self.buffers.pop_front().unwrap();
            return Some(NotFromSet(out));
        }

        let out = StrTendril::from_slice(&buf[..n]);
        let front = self.buffers.front_mut().unwrap();
        *front = StrTendril::from_slice(&front[n..]);
        Some(NotFromSet(out))
    }

    /// Check whether the upcoming characters in the queue case-sensitively or
    /// case-insensitively match `pat`, consuming them if so. Returns `None`
    /// (without consuming anything) if there is not yet enough buffered data
    /// to decide either way — the caller should wait for more input.
    pub fn eat(&mut self, pat: &str, eq: impl Fn(u8, u8) -> bool) -> Option<bool> {
        let mut consumed = 0usize;
        for (i, byte) in pat.bytes().enumerate() {
            let mut seen = 0usize;
            let mut found = None;
            for buf in &self.buffers {
                if seen + buf.len() > i {
                    found = buf.as_bytes().get(i - seen).copied();
                    break;
                }
                seen += buf.len();
            }
            match found {
                None => return None,
                Some(b) if eq(b, byte) => consumed = i + 1,
                Some(_) => return Some(false),
            }
        }
        // All bytes matched; consume them.
        let mut remaining = consumed;
        while remaining > 0 {
            self.drop_empty_front();
            let front = self.buffers.front_mut().expect("eat: buffer underflow");
            if front.len() <= remaining {
                remaining -= front.len();
                self.buffers.pop_front();
            } else {
                *front = StrTendril::from_slice(&front[remaining..]);
                remaining = 0;
            }
        }
        Some(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::small_char_set;

    #[test]
    fn smoke_test() {
        let mut bq = BufferQueue::new();
        assert_eq!(bq.peek(), None);
        assert_eq!(bq.next(), None);

        bq.push_back(StrTendril::from_slice("abc"));
        assert_eq!(bq.peek(), Some('a'));
        assert_eq!(bq.next(), Some('a'));
        assert_eq!(bq.peek(), Some('b'));
        assert_eq!(bq.next(), Some('b'));
        assert_eq!(bq.next(), Some('c'));
        assert_eq!(bq.peek(), None);
        assert_eq!(bq.next(), None);
    }

    #[test]
    fn can_unconsume() {
        let mut bq = BufferQueue::new();
        bq.push_back(StrTendril::from_slice("abc"));
        assert_eq!(bq.next(), Some('a'));
        bq.push_front(StrTendril::from_slice("a"));
        assert_eq!(bq.next(), Some('a'));
        assert_eq!(bq.next(), Some('b'));
        assert_eq!(bq.next(), Some('c'));
    }

    #[test]
    fn pop_except_from_set() {
        let mut bq = BufferQueue::new();
        bq.push_back(StrTendril::from_slice("abc&def"));
        let set = small_char_set!('&' as u32);
        assert_eq!(
            bq.pop_except_from(set),
            Some(NotFromSet(StrTendril::from_slice("abc")))
        );
        assert_eq!(bq.pop_except_from(set), Some(FromSet('&')));
        assert_eq!(
            bq.pop_except_from(set),
            Some(NotFromSet(StrTendril::from_slice("def")))
        );
        assert_eq!(bq.pop_except_from(set), None);
    }

    #[test]
    fn eat_exact_across_chunks() {
        let mut bq = BufferQueue::new();
        bq.push_back(StrTendril::from_slice("DOC"));
        bq.push_back(StrTendril::from_slice("TYPE"));
        assert_eq!(bq.eat("DOCTYPE", |a, b| a == b), Some(true));
        assert_eq!(bq.next(), None);
    }

    #[test]
    fn eat_waits_for_more_input() {
        let mut bq = BufferQueue::new();
        bq.push_back(StrTendril::from_slice("DOC"));
        assert_eq!(bq.eat("DOCTYPE", |a, b| a == b), None);
    }

    #[test]
    fn eat_mismatch() {
        let mut bq = BufferQueue::new();
        bq.push_back(StrTendril::from_slice("DOCFOO"));
        assert_eq!(bq.eat("DOCTYPE", |a, b| a == b), Some(false));
    }
}
