//! Decides what to announce for a result set, including the time-keyed
//! joke-selection policy with cooldown semantics.

use super::{Prosody, SpeechSink, Utterance};
use crate::classify::Recognition;
use crate::log_debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

/// Probability of feeling funny on any given announcement.
pub const HUMOR_THRESHOLD: f32 = 0.2;

/// With multiple results, name only the top one if it is at least this
/// confident.
pub const SINGLE_ANSWER_CONFIDENCE_THRESHOLD: f32 = 0.4;

/// Never repeat the same joke within this span.
pub const JOKE_COOLDOWN_MS: u64 = 2 * 60 * 1000;

const READY: Utterance = Utterance::Plain("I'm ready!");
const NO_RESULT: Utterance = Utterance::Plain("I don't understand what I see.");
const NO_RESULT_FUNNY: Utterance =
    Utterance::Plain("Please don't unplug me, I'll do better next time.");

/// Short and frequently reused, so this pool is not cooldown-gated.
const SHUTTER_SOUNDS: [Utterance; 3] = [
    Utterance::Accented {
        text: "Click!",
        pitch: 1.5,
        rate: 1.5,
    },
    Utterance::Accented {
        text: "Cheeeeese!",
        pitch: 1.5,
        rate: 1.5,
    },
    Utterance::Accented {
        text: "Smile!",
        pitch: 1.5,
        rate: 1.5,
    },
];

const JOKES: [Utterance; 4] = [
    Utterance::Plain("It's a bird! It's a plane! It's... it's..."),
    Utterance::Plain("Oops, someone left the lens cap on! Just kidding..."),
    Utterance::Plain("Hey, that looks like me! Just kidding..."),
    Utterance::Accented {
        text: "I see dead people... Just kidding...",
        pitch: 0.2,
        rate: 1.0,
    },
];

/// Registry key: (last-spoken milliseconds, insertion-order disambiguator).
/// The second component keeps same-millisecond keys unique without ever
/// reordering earlier entries past later ones.
type JokeKey = (u64, u64);

/// Chooses utterances for pipeline milestones.
///
/// Holds the joke registry: every joke appears exactly once, keyed by the
/// time it was last spoken. Spoken jokes are removed and immediately
/// reinserted under the current time, so the pool never grows or shrinks.
pub struct AnnouncementScheduler {
    jokes: BTreeMap<JokeKey, Utterance>,
    next_seq: u64,
    cooldown_ms: u64,
    humor: bool,
    rng: StdRng,
    #[cfg(test)]
    funny_override: Option<bool>,
}

impl AnnouncementScheduler {
    pub fn new(cooldown_ms: u64) -> Self {
        Self::with_rng(cooldown_ms, StdRng::from_entropy())
    }

    /// Deterministic variant for tests and reproducible demos.
    pub fn with_seed(cooldown_ms: u64, seed: u64) -> Self {
        Self::with_rng(cooldown_ms, StdRng::seed_from_u64(seed))
    }

    fn with_rng(cooldown_ms: u64, rng: StdRng) -> Self {
        let mut jokes = BTreeMap::new();
        let mut next_seq = 0;
        for joke in JOKES {
            // Same seed timestamp for all; the sequence keeps keys unique.
            jokes.insert((0, next_seq), joke);
            next_seq += 1;
        }
        Self {
            jokes,
            next_seq,
            cooldown_ms,
            humor: true,
            rng,
            #[cfg(test)]
            funny_override: None,
        }
    }

    /// Turn joke insertion on or off. Off means no joke is ever played.
    pub fn set_humor(&mut self, humor: bool) {
        self.humor = humor;
    }

    pub fn has_humor(&self) -> bool {
        self.humor
    }

    pub fn announce_ready(&mut self, sink: &mut dyn SpeechSink) {
        READY.speak(sink);
    }

    pub fn announce_shutter(&mut self, sink: &mut dyn SpeechSink) {
        let pick = self.rng.gen_range(0..SHUTTER_SOUNDS.len());
        SHUTTER_SOUNDS[pick].speak(sink);
    }

    /// Announce a ranked result set. `now_ms` keys the joke cooldown; the
    /// caller supplies wall-clock milliseconds.
    pub fn announce_results(
        &mut self,
        sink: &mut dyn SpeechSink,
        results: &[Recognition],
        now_ms: u64,
    ) {
        if results.is_empty() {
            NO_RESULT.speak(sink);
            if self.feeling_funny() {
                NO_RESULT_FUNNY.speak(sink);
            }
            return;
        }

        if self.feeling_funny() {
            self.play_joke(sink, now_ms);
        }
        if results.len() == 1 || results[0].confidence > SINGLE_ANSWER_CONFIDENCE_THRESHOLD {
            sink.enqueue(
                &format!("I see a {}", results[0].title),
                Prosody::default(),
            );
        } else {
            sink.enqueue(
                &format!(
                    "This is a {}, or maybe a {}",
                    results[0].title, results[1].title
                ),
                Prosody::default(),
            );
        }
    }

    fn feeling_funny(&mut self) -> bool {
        #[cfg(test)]
        if let Some(forced) = self.funny_override {
            return self.humor && forced;
        }
        self.humor && self.rng.gen::<f32>() < HUMOR_THRESHOLD
    }

    /// Speak one cooled-down joke, if any, and re-key it under `now_ms`.
    ///
    /// Eligibility is strict: a joke last spoken at `t` qualifies only while
    /// `t < now_ms - cooldown`, so it becomes selectable again at exactly
    /// `t + cooldown + 1`. When nothing has cooled down, no joke is spoken
    /// this round.
    fn play_joke(&mut self, sink: &mut dyn SpeechSink, now_ms: u64) -> bool {
        let cutoff = now_ms.saturating_sub(self.cooldown_ms);
        let eligible = self.jokes.range(..(cutoff, 0)).count();
        if eligible == 0 {
            log_debug("speech: humor felt, but every joke is still cooling down");
            return false;
        }

        let pick = self.rng.gen_range(0..eligible);
        let key = self
            .jokes
            .range(..(cutoff, 0))
            .nth(pick)
            .map(|(key, _)| *key)
            .expect("picked index is within the eligible range");
        let joke = self
            .jokes
            .remove(&key)
            .expect("eligible key is present in the registry");
        joke.speak(sink);
        self.jokes.insert((now_ms, self.next_seq), joke);
        self.next_seq += 1;
        true
    }

    #[cfg(test)]
    fn set_funny_override(&mut self, forced: Option<bool>) {
        self.funny_override = forced;
    }

    #[cfg(test)]
    fn registry_len(&self) -> usize {
        self.jokes.len()
    }
}
