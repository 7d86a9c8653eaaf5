use std::collections::VecDeque;

use ndarray::Array3;
use tracing::{debug, info};

use crate::constants::{EVENT_FEATURES, WINDOW_LENGTH};

use super::event_codec::EventTriple;

/// Where the initial window content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOrigin {
    /// Built from the caller's seed triples.
    Seeded,
    /// The seed was empty and the window holds only the default triple.
    DefaultFallback,
}

/// Rolling context of exactly `WINDOW_LENGTH` triples, most recent last.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedWindow {
    events: VecDeque<EventTriple>,
}

impl SeedWindow {
    /// Build the initial window from seed triples.
    ///
    /// # Arguments
    ///
    /// * `seed` - Seed triples in time order, possibly empty.
    ///
    /// # Returns
    ///
    /// * The window and whether the default triple had to stand in for an empty seed.
    ///   Short seeds are tiled end to end and the last `WINDOW_LENGTH` elements kept, so
    ///   `window[i] = seed[(i + offset) % n]` with `offset = (n - WINDOW_LENGTH % n) % n`.
    pub fn from_seed(seed: &[EventTriple]) -> (Self, SeedOrigin) {
        if seed.is_empty() {
            info!("empty seed, filling window with the default event");
            let events = std::iter::repeat(EventTriple::DEFAULT).take(WINDOW_LENGTH).collect();
            return (SeedWindow { events }, SeedOrigin::DefaultFallback);
        }

        let n = seed.len();
        let events = if n >= WINDOW_LENGTH {
            seed[n - WINDOW_LENGTH..].iter().copied().collect()
        } else {
            let offset = (n - WINDOW_LENGTH % n) % n;
            (0..WINDOW_LENGTH).map(|i| seed[(i + offset) % n]).collect()
        };
        debug!(seed_len = n, "built seed window");

        (SeedWindow { events }, SeedOrigin::Seeded)
    }

    /// Append the newest event and drop the oldest one.
    pub fn push(&mut self, event: EventTriple) {
        self.events.push_back(event);
        while self.events.len() > WINDOW_LENGTH {
            self.events.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventTriple> {
        self.events.iter()
    }

    pub fn last(&self) -> Option<&EventTriple> {
        self.events.back()
    }

    /// Model input of shape `(1, WINDOW_LENGTH, 3)`.
    pub fn to_input_tensor(&self) -> Array3<f32> {
        let mut input = Array3::zeros((1, WINDOW_LENGTH, EVENT_FEATURES));
        for (i, event) in self.events.iter().enumerate() {
            for (j, value) in event.features().into_iter().enumerate() {
                input[[0, i, j]] = value;
            }
        }
        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triples(n: usize) -> Vec<EventTriple> {
        (0..n).map(|i| EventTriple::new(40 + i as u8, i as f64 * 0.1, 0.25)).collect()
    }

    #[test]
    fn test_empty_seed_uses_default() {
        let (window, origin) = SeedWindow::from_seed(&[]);
        assert_eq!(origin, SeedOrigin::DefaultFallback);
        assert_eq!(window.len(), WINDOW_LENGTH);
        assert!(window.iter().all(|e| *e == EventTriple::new(60, 0.0, 0.5)));
    }

    #[test]
    fn test_single_event_is_repeated() {
        let seed = [EventTriple::new(67, 0.3, 0.2)];
        let (window, origin) = SeedWindow::from_seed(&seed);
        assert_eq!(origin, SeedOrigin::Seeded);
        assert_eq!(window.len(), WINDOW_LENGTH);
        assert!(window.iter().all(|e| *e == seed[0]));
    }

    #[test]
    fn test_long_seed_keeps_last_twenty() {
        let seed = triples(33);
        let (window, _) = SeedWindow::from_seed(&seed);
        let kept: Vec<EventTriple> = window.iter().copied().collect();
        assert_eq!(kept, seed[13..].to_vec());
    }

    #[test]
    fn test_short_seed_is_tiled_with_most_recent_last() {
        let seed = triples(3);
        let (window, _) = SeedWindow::from_seed(&seed);
        let kept: Vec<EventTriple> = window.iter().copied().collect();

        // Same result as tiling seven copies and keeping the tail.
        let tiled: Vec<EventTriple> = seed.iter().copied().cycle().take(21).collect();
        assert_eq!(kept, tiled[1..].to_vec());
        assert_eq!(window.last(), Some(&seed[2]));
    }

    #[test]
    fn test_push_keeps_length() {
        let (mut window, _) = SeedWindow::from_seed(&triples(5));
        for i in 0..50 {
            window.push(EventTriple::new(i, 0.1, 0.1));
            assert_eq!(window.len(), WINDOW_LENGTH);
        }
        assert_eq!(window.last(), Some(&EventTriple::new(49, 0.1, 0.1)));
        assert_eq!(window.iter().next(), Some(&EventTriple::new(30, 0.1, 0.1)));
    }

    #[test]
    fn test_input_tensor_shape_and_values() {
        let (window, _) = SeedWindow::from_seed(&triples(20));
        let input = window.to_input_tensor();
        assert_eq!(input.shape(), &[1, WINDOW_LENGTH, EVENT_FEATURES]);
        assert_eq!(input[[0, 19, 0]], 59.0);
        assert_eq!(input[[0, 0, 2]], 0.25);
    }
}
