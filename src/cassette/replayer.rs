//! Replays recorded interactions from a cassette.

use std::collections::HashMap;

use super::format::{Cassette, Interaction};

/// Key for indexing interactions by port and method.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
struct PortMethodKey {
    port: String,
    method: String,
}

/// Replays interactions from a loaded cassette.
///
/// Sequential ports are served in recorded order per port/method pair.
/// Ports called concurrently (the registry) look interactions up by input
/// instead, since their recording order is not reproducible.
pub struct CassetteReplayer {
    /// Per port+method queue of interactions (in order).
    queues: HashMap<PortMethodKey, Vec<Interaction>>,
    /// Per port+method cursor tracking position.
    cursors: HashMap<PortMethodKey, usize>,
    /// Per port+method flags for interactions already served by input.
    matched: HashMap<PortMethodKey, Vec<bool>>,
}

impl CassetteReplayer {
    /// Create a new replayer from a loaded cassette.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        let mut queues: HashMap<PortMethodKey, Vec<Interaction>> = HashMap::new();
        for interaction in &cassette.interactions {
            let key = PortMethodKey {
                port: interaction.port.clone(),
                method: interaction.method.clone(),
            };
            queues.entry(key).or_default().push(interaction.clone());
        }
        let cursors = queues.keys().map(|k| (k.clone(), 0)).collect();
        let matched = queues.iter().map(|(k, q)| (k.clone(), vec![false; q.len()])).collect();
        Self { queues, cursors, matched }
    }

    fn available(&self) -> String {
        let mut pairs: Vec<String> =
            self.queues.keys().map(|k| format!("{}::{}", k.port, k.method)).collect();
        pairs.sort();
        pairs.join(", ")
    }

    /// Return the next interaction for the given port and method.
    ///
    /// # Panics
    ///
    /// Panics if the cassette has no (more) interactions for the given
    /// port/method combination, printing a clear error showing what was
    /// requested versus what interactions remain.
    pub fn next_interaction(&mut self, port: &str, method: &str) -> &Interaction {
        let key = PortMethodKey { port: port.to_string(), method: method.to_string() };

        let Some(queue) = self.queues.get(&key) else {
            panic!(
                "Cassette exhausted: no interactions recorded for port={port:?} method={method:?}. \
                 Available port::method pairs: [{}]",
                self.available()
            );
        };

        let cursor = self.cursors.entry(key).or_insert(0);
        assert!(
            *cursor < queue.len(),
            "Cassette exhausted: all {count} interactions for port={port:?} method={method:?} \
             have been consumed. Last interaction was seq={last_seq}.",
            count = queue.len(),
            last_seq = queue.last().map_or(0, |i| i.seq),
        );

        let interaction = &queue[*cursor];
        *cursor += 1;
        interaction
    }

    /// Return the first unserved interaction whose input equals `input`.
    ///
    /// # Panics
    ///
    /// Panics if no unserved interaction for the port/method has that input.
    pub fn find_interaction(
        &mut self,
        port: &str,
        method: &str,
        input: &serde_json::Value,
    ) -> &Interaction {
        let key = PortMethodKey { port: port.to_string(), method: method.to_string() };

        let Some(queue) = self.queues.get(&key) else {
            panic!(
                "Cassette exhausted: no interactions recorded for port={port:?} method={method:?}. \
                 Available port::method pairs: [{}]",
                self.available()
            );
        };

        let served = self.matched.entry(key).or_insert_with(|| vec![false; queue.len()]);
        let Some(index) =
            queue.iter().enumerate().position(|(i, item)| !served[i] && item.input == *input)
        else {
            panic!(
                "Cassette exhausted: no unserved interaction for port={port:?} method={method:?} \
                 with input {input}"
            );
        };

        served[index] = true;
        &queue[index]
    }
}
