use crate::api::types::{EffectEvent, EffectKind, FxError, FxResult};
use crate::bus::replay::{Recorder, REPLAY_CAPACITY};
use crate::core::hash::{digest_event32, FRAME_DIGEST_SEED};

/// Maximum events accepted per frame.
pub const QUEUE_CAPACITY: usize = 256;

/// Receiver of dispatched events. The pipeline routes these to the mixer
/// and the VFX simulator; tests plug in a collector.
pub trait EffectSink {
    fn play_audio(&mut self, event: &EffectEvent);
    fn spawn_vfx(&mut self, event: &EffectEvent);
}

/// Double-buffered per-frame effect queue.
///
/// Call order each frame: `frame_begin` → `emit`* → `frame_end` →
/// `dispatch_process`. Events become readable only after `frame_end`.
pub struct FxBus {
    queues: [Vec<EffectEvent>; 2],
    /// Index of the write queue; the read queue is `write ^ 1`.
    write: usize,
    capacity: usize,
    frame_index: u32,
    seq: u32,
    digest: u32,
    recorder: Recorder,
}

impl FxBus {
    pub fn new() -> Self {
        Self::with_capacity(QUEUE_CAPACITY, REPLAY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize, replay_capacity: usize) -> Self {
        Self {
            queues: [Vec::with_capacity(capacity), Vec::with_capacity(capacity)],
            write: 0,
            capacity,
            frame_index: 0,
            seq: 0,
            digest: FRAME_DIGEST_SEED,
            recorder: Recorder::new(replay_capacity),
        }
    }

    /// Start a frame: empty the write queue, reset sequencing, reseed the digest.
    pub fn frame_begin(&mut self, frame_index: u32) {
        self.frame_index = frame_index;
        self.seq = 0;
        self.digest = FRAME_DIGEST_SEED ^ frame_index;
        self.queues[self.write].clear();
    }

    /// Queue an event for this frame. A full queue drops the event.
    pub fn emit(&mut self, event: EffectEvent) -> FxResult<()> {
        let queue = &mut self.queues[self.write];
        if queue.len() >= self.capacity {
            log::debug!("fx bus full, dropping '{}'", event.id_str());
            return Err(FxError::QueueFull);
        }
        let mut stamped = event;
        stamped.emit_frame = self.frame_index;
        stamped.seq = self.seq;
        self.seq = self.seq.wrapping_add(1);
        queue.push(stamped);
        self.recorder.capture(&stamped);
        Ok(())
    }

    /// Swap write and read queues.
    pub fn frame_end(&mut self) {
        self.write ^= 1;
    }

    /// Sort, compact and dispatch the read queue, folding every compacted
    /// event into the frame digest. Returns the number of compacted events.
    pub fn dispatch_process(&mut self, sink: &mut impl EffectSink) -> usize {
        let read = &mut self.queues[self.write ^ 1];
        if read.is_empty() {
            return 0;
        }

        // Kind sits before seq so each (kind, priority, id) group is one
        // contiguous run whatever the call-site order was.
        read.sort_by(|a, b| {
            a.emit_frame
                .cmp(&b.emit_frame)
                .then(a.priority.cmp(&b.priority))
                .then_with(|| a.id_bytes().cmp(b.id_bytes()))
                .then(a.kind.cmp(&b.kind))
                .then(a.seq.cmp(&b.seq))
        });

        let mut out = 0;
        let mut i = 0;
        while i < read.len() {
            let mut merged = read[i];
            merged.repeats = merged.effective_repeats();
            let mut j = i + 1;
            while j < read.len() && read[j].same_identity(&merged) {
                merged.repeats = merged.repeats.saturating_add(read[j].effective_repeats());
                j += 1;
            }
            read[out] = merged;
            out += 1;
            i = j;
        }
        read.truncate(out);

        for (slot, event) in read.iter_mut().enumerate() {
            event.seq = slot as u32;
            self.digest ^= digest_event32(event);
            match event.effect_kind() {
                Some(EffectKind::AudioPlay) => sink.play_audio(event),
                Some(EffectKind::VfxSpawn) => sink.spawn_vfx(event),
                None => log::debug!("fx bus: unknown event kind {}", event.kind),
            }
        }

        let processed = read.len();
        read.clear();
        processed
    }

    pub fn frame_digest(&self) -> u32 {
        self.digest
    }

    pub fn current_frame(&self) -> u32 {
        self.frame_index
    }

    /// Events emitted so far this frame.
    pub fn pending(&self) -> usize {
        self.queues[self.write].len()
    }

    /// Events waiting for `dispatch_process`.
    pub fn readable(&self) -> usize {
        self.queues[self.write ^ 1].len()
    }

    // -- Recording --

    pub fn begin_record(&mut self) {
        log::debug!("fx bus: recording started at frame {}", self.frame_index);
        self.recorder.begin();
    }

    /// Stop recording and hand back everything captured.
    pub fn end_record(&mut self) -> Vec<EffectEvent> {
        let events = self.recorder.end();
        log::debug!("fx bus: recording stopped, {} events", events.len());
        events
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_active()
    }
}

impl Default for FxBus {
    fn default() -> Self {
        Self::new()
    }
}
