use crossbeam_channel::{bounded, Receiver, Sender};

/// Which event source a notice belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Panel {
    Grid,
    Bouncer,
    Rippler,
}

/// "Step N was scheduled at time T" - consumed by the UI playhead.
/// Strictly downstream of audio; timing precision is cosmetic here.
#[derive(Clone, Copy, Debug)]
pub struct StepNotice {
    pub panel: Panel,
    pub step: usize,
    pub time: f64,
}

/// Emitter side of the step-notice channel. Notices are dropped when the
/// buffer is full; a missed highlight never affects audio timing.
#[derive(Clone)]
pub struct StepSync {
    tx: Sender<StepNotice>,
}

impl StepSync {
    pub fn channel() -> (StepSync, Receiver<StepNotice>) {
        let (tx, rx) = bounded(512);
        (Self { tx }, rx)
    }

    pub fn notify(&self, panel: Panel, step: usize, time: f64) {
        let _ = self.tx.try_send(StepNotice { panel, step, time });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_arrive_in_order() {
        let (sync, rx) = StepSync::channel();
        sync.notify(Panel::Grid, 0, 0.05);
        sync.notify(Panel::Grid, 1, 0.30);

        let a = rx.try_recv().unwrap();
        let b = rx.try_recv().unwrap();
        assert_eq!(a.step, 0);
        assert_eq!(b.step, 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn full_buffer_drops_instead_of_blocking() {
        let (sync, rx) = StepSync::channel();
        for i in 0..1000 {
            sync.notify(Panel::Grid, i, i as f64);
        }
        // Channel capacity bounds what arrives; the overflow was dropped
        assert!(rx.len() <= 512);
    }
}
