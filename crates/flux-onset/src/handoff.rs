use crossbeam::queue::ArrayQueue;
use std::sync::{Arc, Weak};

use crate::error::{OnsetError, Result};

/// Producer half of a [`SpectrumChannel`], meant for the analysis thread.
#[derive(Debug, Clone)]
pub struct SpectrumSender {
    queue: Weak<ArrayQueue<Vec<f32>>>,
    bin_count: usize,
}

impl SpectrumSender {
    /// Hand over one spectrum snapshot.
    ///
    /// Rejects snapshots of the wrong length. When the queue is full the
    /// oldest pending snapshot is evicted, so the consumer always sees the
    /// most recent spectrum.
    pub fn send(&self, spectrum: Vec<f32>) -> Result<()> {
        if spectrum.len() != self.bin_count {
            return Err(OnsetError::SpectrumLength {
                expected: self.bin_count,
                actual: spectrum.len(),
            });
        }
        let Some(queue) = self.queue.upgrade() else {
            log::warn!("spectrum channel dropped, discarding snapshot");
            return Err(OnsetError::Disconnected);
        };
        queue.force_push(spectrum);
        Ok(())
    }

    pub fn bin_count(&self) -> usize {
        self.bin_count
    }
}

/// Hands frozen spectrum snapshots from an analysis thread to the tick loop.
///
/// The consumer calls [`SpectrumChannel::poll`] once per tick; it drains the
/// queue, keeps only the newest snapshot and reports whether anything new
/// arrived since the previous poll. Dropping the channel disconnects every
/// sender.
pub struct SpectrumChannel {
    queue: Arc<ArrayQueue<Vec<f32>>>,
    current: Vec<f32>,
    updated: bool,
}

impl SpectrumChannel {
    /// Create a channel for spectra of `bin_count` bins holding at most
    /// `capacity` pending snapshots.
    pub fn new(bin_count: usize, capacity: usize) -> Self {
        Self {
            queue: Arc::new(ArrayQueue::new(capacity.max(1))),
            current: vec![0.0; bin_count],
            updated: false,
        }
    }

    pub fn sender(&self) -> SpectrumSender {
        SpectrumSender {
            queue: Arc::downgrade(&self.queue),
            bin_count: self.current.len(),
        }
    }

    /// Take the newest pending snapshot, if any. Returns `true` when a new
    /// spectrum is available.
    pub fn poll(&mut self) -> bool {
        let mut newest = None;
        while let Some(spectrum) = self.queue.pop() {
            newest = Some(spectrum);
        }
        self.updated = match newest {
            Some(spectrum) => {
                self.current = spectrum;
                true
            }
            None => false,
        };
        self.updated
    }

    /// Whether the last poll delivered a new snapshot.
    pub fn is_updated(&self) -> bool {
        self.updated
    }

    pub fn spectrum(&self) -> &[f32] {
        &self.current
    }

    pub fn bin_count(&self) -> usize {
        self.current.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_keeps_newest() {
        let mut channel = SpectrumChannel::new(4, 8);
        let tx = channel.sender();
        tx.send(vec![1.0; 4]).unwrap();
        tx.send(vec![2.0; 4]).unwrap();
        assert!(channel.poll());
        assert_eq!(channel.spectrum(), &[2.0; 4]);
        assert!(!channel.poll());
        assert!(!channel.is_updated());
        assert_eq!(channel.spectrum(), &[2.0; 4]);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let channel = SpectrumChannel::new(4, 2);
        let err = channel.sender().send(vec![0.0; 3]).unwrap_err();
        assert!(matches!(err, OnsetError::SpectrumLength { expected: 4, actual: 3 }));
    }

    #[test]
    fn test_full_queue_keeps_newest() {
        let mut channel = SpectrumChannel::new(1, 2);
        let tx = channel.sender();
        for i in 0..10 {
            tx.send(vec![i as f32]).unwrap();
        }
        assert!(channel.poll());
        assert_eq!(channel.spectrum(), &[9.0]);
    }

    #[test]
    fn test_send_after_channel_dropped() {
        let channel = SpectrumChannel::new(2, 2);
        let tx = channel.sender();
        drop(channel);
        assert!(matches!(tx.send(vec![0.0, 0.0]), Err(OnsetError::Disconnected)));
    }

    #[test]
    fn test_send_from_thread() {
        let mut channel = SpectrumChannel::new(3, 4);
        let tx = channel.sender();
        std::thread::spawn(move || tx.send(vec![0.5; 3]).unwrap())
            .join()
            .unwrap();
        assert!(channel.poll());
        assert_eq!(channel.spectrum(), &[0.5; 3]);
    }
}
