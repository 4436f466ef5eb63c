//! Text triggers and the message queue
//!
//! Triggers are invisible boxes placed in the level. Touching one with a leg
//! queues its text. Messages are shown one at a time: the current one is
//! revealed a character at a time, then lingers for its TTL before the next
//! queued message takes the slot.

use std::collections::VecDeque;

use glam::Vec2;

use crate::consts::*;
use crate::error::LevelError;
use crate::sim::body::{Body, BodyKind, Owner, Rect};
use crate::sim::state::SimEvent;

/// A level-placed text trigger
#[derive(Debug, Clone)]
pub struct TextTrigger {
    pub body: Body,
    pub text: String,
    /// Seconds the text stays up after it is fully revealed
    pub ttl: f32,
    /// Repeatable triggers stay in place once fired
    pub repeat: bool,
}

impl TextTrigger {
    /// Build from a placement at `(x, y)` of size `(w, h)`; the box is lifted
    /// by its own height.
    ///
    /// Exactly three properties are expected: `string`, `repeat` (true when
    /// the value starts with `t`) and `ttl` in milliseconds.
    pub fn from_properties(
        index: u32,
        rect: Rect,
        properties: &[(String, String)],
    ) -> Result<Self, LevelError> {
        if properties.len() != 3 {
            return Err(LevelError::PropertyCount {
                entity: "text".to_string(),
                expected: 3,
                found: properties.len(),
            });
        }

        let mut text = String::new();
        let mut repeat = false;
        let mut ttl = 0.0;
        for (key, value) in properties {
            match key.as_str() {
                "string" => text = value.clone(),
                "repeat" => repeat = value.starts_with('t'),
                "ttl" => {
                    let ms: u32 = value.trim().parse().map_err(|_| LevelError::InvalidProperty {
                        key: key.clone(),
                        value: value.clone(),
                    })?;
                    ttl = ms as f32 / 1000.0;
                }
                _ => {
                    return Err(LevelError::InvalidProperty {
                        key: key.clone(),
                        value: value.clone(),
                    });
                }
            }
        }

        let rect = Rect {
            pos: rect.pos - Vec2::new(0.0, rect.size.y),
            size: rect.size,
        };
        Ok(Self {
            body: Body::new(BodyKind::Text, Owner::Trigger(index), rect).immovable(),
            text,
            ttl,
            repeat,
        })
    }
}

/// Character-by-character reveal of one message
#[derive(Debug, Clone, Default)]
pub struct Typewriter {
    chars: Vec<char>,
    shown: usize,
    clock: f32,
    delay: f32,
}

impl Typewriter {
    pub fn new(delay: f32) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn start(&mut self, text: &str) {
        self.chars = text.chars().collect();
        self.shown = 0;
        self.clock = 0.0;
    }

    pub fn clear(&mut self) {
        self.chars.clear();
        self.shown = 0;
        self.clock = 0.0;
    }

    pub fn is_finished(&self) -> bool {
        self.shown >= self.chars.len()
    }

    pub fn visible(&self) -> String {
        self.chars[..self.shown].iter().collect()
    }

    pub fn update(&mut self, dt: f32) {
        if self.is_finished() {
            return;
        }
        self.clock += dt;
        if self.delay <= 0.0 {
            self.shown = self.chars.len();
            return;
        }
        while self.clock >= self.delay && !self.is_finished() {
            self.clock -= self.delay;
            self.shown += 1;
        }
    }
}

#[derive(Debug, Clone)]
enum Queued {
    Trigger(u32),
    Message { text: String, ttl: f32 },
}

#[derive(Debug, Clone)]
pub struct TextManager {
    triggers: Vec<TextTrigger>,
    queue: VecDeque<Queued>,
    /// TTL of the message in the display slot
    current: Option<f32>,
    typewriter: Typewriter,
    /// Time since the current message finished revealing
    lingered: f32,
}

impl TextManager {
    pub fn new(char_delay: f32) -> Self {
        Self {
            triggers: Vec::new(),
            queue: VecDeque::new(),
            current: None,
            typewriter: Typewriter::new(char_delay),
            lingered: 0.0,
        }
    }

    /// Register a level trigger, returning its index
    pub fn add_trigger(
        &mut self,
        rect: Rect,
        properties: &[(String, String)],
    ) -> Result<u32, LevelError> {
        let index = self.triggers.len() as u32;
        self.triggers.push(TextTrigger::from_properties(index, rect, properties)?);
        Ok(index)
    }

    pub fn triggers(&self) -> &[TextTrigger] {
        &self.triggers
    }

    pub fn trigger(&self, index: u32) -> Option<&TextTrigger> {
        self.triggers.get(index as usize)
    }

    pub fn trigger_mut(&mut self, index: u32) -> Option<&mut TextTrigger> {
        self.triggers.get_mut(index as usize)
    }

    /// Queue a trigger's text. A non-repeatable trigger is parked off-world
    /// so it cannot fire again; a repeatable one is not queued twice in a row.
    pub fn push_trigger(&mut self, index: u32) {
        let Some(trigger) = self.triggers.get_mut(index as usize) else {
            return;
        };
        if matches!(self.queue.back(), Some(Queued::Trigger(last)) if *last == index) {
            return;
        }
        self.queue.push_back(Queued::Trigger(index));
        if !trigger.repeat {
            trigger.body.set_position(Vec2::splat(OFF_WORLD));
            trigger.body.set_size(Vec2::splat(2.0));
        }
    }

    /// Queue a message that does not come from a trigger
    pub fn push_text(&mut self, text: impl Into<String>, ttl: f32) {
        self.queue.push_back(Queued::Message { text: text.into(), ttl });
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Portion of the current message revealed so far
    pub fn current_text(&self) -> Option<String> {
        self.current.map(|_| self.typewriter.visible())
    }

    #[cfg(test)]
    fn is_idle(&self) -> bool {
        self.current.is_none() && self.queue.is_empty()
    }

    /// Advance the display slot. Runs after every query of the tick.
    pub fn post_update(&mut self, dt: f32, events: &mut Vec<SimEvent>) {
        if self.typewriter.is_finished() {
            if let Some(ttl) = self.current {
                self.lingered += dt;
                if self.lingered > ttl {
                    self.current = None;
                    self.lingered = 0.0;
                    self.typewriter.clear();
                }
            }

            if self.current.is_none() {
                if let Some(next) = self.queue.pop_front() {
                    let (text, ttl) = match next {
                        Queued::Trigger(index) => {
                            let trigger = &self.triggers[index as usize];
                            (trigger.text.clone(), trigger.ttl)
                        }
                        Queued::Message { text, ttl } => (text, ttl),
                    };
                    log::debug!("Showing text: {text:?}");
                    self.typewriter.start(&text);
                    self.current = Some(ttl);
                    events.push(SimEvent::TextShown);
                }
            }
        }

        self.typewriter.update(dt);
    }
}
