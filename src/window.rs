// src/window.rs - Rolling window of recent hand observations
use nalgebra::Vector2;

/// One tick as seen by the wave detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowSample {
    Hand {
        timestamp: f64,
        centroid: Vector2<f64>,
        confidence: f64,
    },
    /// No hand was tracked this tick.
    Lost { timestamp: f64 },
}

impl WindowSample {
    pub fn timestamp(&self) -> f64 {
        match *self {
            WindowSample::Hand { timestamp, .. } | WindowSample::Lost { timestamp } => timestamp,
        }
    }

    /// Centroid if the sample is a hand at or above `min_confidence`.
    pub fn valid_centroid(&self, min_confidence: f64) -> Option<Vector2<f64>> {
        match *self {
            WindowSample::Hand { centroid, confidence, .. } if confidence >= min_confidence => {
                Some(centroid)
            }
            _ => None,
        }
    }
}

/// Fixed-capacity arena with a write cursor. Once full, each push
/// overwrites the oldest sample. No allocation after construction.
pub struct GestureWindow {
    slots: Vec<WindowSample>,
    capacity: usize,
    /// Next slot to write.
    cursor: usize,
    len: usize,
}

impl GestureWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: vec![WindowSample::Lost { timestamp: 0.0 }; capacity],
            capacity,
            cursor: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, sample: WindowSample) {
        self.slots[self.cursor] = sample;
        self.cursor = (self.cursor + 1) % self.capacity;
        if self.len < self.capacity {
            self.len += 1;
        }
    }

    pub fn clear(&mut self) {
        self.cursor = 0;
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &WindowSample> + '_ {
        let start = (self.cursor + self.capacity - self.len) % self.capacity;
        (0..self.len).map(move |i| &self.slots[(start + i) % self.capacity])
    }

    pub fn newest(&self) -> Option<&WindowSample> {
        if self.len == 0 {
            None
        } else {
            Some(&self.slots[(self.cursor + self.capacity - 1) % self.capacity])
        }
    }

    /// Centroids of the samples that pass the confidence gate, oldest first.
    pub fn valid_centroids(&self, min_confidence: f64) -> impl Iterator<Item = Vector2<f64>> + '_ {
        self.iter().filter_map(move |s| s.valid_centroid(min_confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand(t: f64, x: f64, confidence: f64) -> WindowSample {
        WindowSample::Hand {
            timestamp: t,
            centroid: Vector2::new(x, 0.5),
            confidence,
        }
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut window = GestureWindow::new(3);
        for i in 0..5 {
            window.push(hand(i as f64, i as f64 * 0.1, 0.9));
        }
        assert!(window.is_full());
        let times: Vec<f64> = window.iter().map(|s| s.timestamp()).collect();
        assert_eq!(times, vec![2.0, 3.0, 4.0]);
        assert_eq!(window.newest().map(|s| s.timestamp()), Some(4.0));
    }

    #[test]
    fn order_before_wraparound() {
        let mut window = GestureWindow::new(4);
        window.push(hand(0.0, 0.0, 0.9));
        window.push(WindowSample::Lost { timestamp: 1.0 });
        let times: Vec<f64> = window.iter().map(|s| s.timestamp()).collect();
        assert_eq!(times, vec![0.0, 1.0]);
        assert_eq!(window.len(), 2);
        assert!(!window.is_full());
    }

    #[test]
    fn valid_centroids_skip_lost_and_low_confidence() {
        let mut window = GestureWindow::new(5);
        window.push(hand(0.0, 0.1, 0.9));
        window.push(hand(1.0, 0.2, 0.2));
        window.push(WindowSample::Lost { timestamp: 2.0 });
        window.push(hand(3.0, 0.4, 0.6));
        let xs: Vec<f64> = window.valid_centroids(0.5).map(|c| c.x).collect();
        assert_eq!(xs, vec![0.1, 0.4]);
    }

    #[test]
    fn clear_empties_window() {
        let mut window = GestureWindow::new(2);
        window.push(hand(0.0, 0.1, 0.9));
        window.clear();
        assert!(window.is_empty());
        assert!(window.newest().is_none());
        assert_eq!(window.iter().count(), 0);
        assert_eq!(window.capacity(), 2);
    }
}
