//! Server selection.
//!
//! Servers are ranked by effective priority (configured priority plus the
//! server's undesirability score), lowest first. Exact ties are broken by a
//! random value drawn once per ranking pass for each server identity.

use std::collections::HashMap;

use rand::RngCore;

use crate::config::ServerConfig;

/// Undesirability scores keyed by server identity.
///
/// Scores survive reconnects and config reloads; a server's entry is cleared
/// once it connects successfully.
#[derive(Debug, Clone, Default)]
pub struct ServerScores {
    scores: HashMap<String, u32>,
}

impl ServerScores {
    pub fn get(&self, server: &ServerConfig) -> u32 {
        self.scores.get(&server.identity()).copied().unwrap_or(0)
    }

    /// Increment `server`'s score and return the new value.
    pub fn flag(&mut self, server: &ServerConfig) -> u32 {
        let score = self.scores.entry(server.identity()).or_insert(0);
        *score = score.saturating_add(1);
        *score
    }

    pub fn clear(&mut self, server: &ServerConfig) {
        self.scores.remove(&server.identity());
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Order `servers` from most to least preferred.
///
/// The sort is stable, so servers sharing an identity keep their
/// configuration order relative to each other.
pub fn rank_servers<'a>(
    servers: &'a [ServerConfig],
    scores: &ServerScores,
    rng: &mut dyn RngCore,
) -> Vec<&'a ServerConfig> {
    let mut tiebreaks: HashMap<String, u32> = HashMap::new();
    let mut ranked: Vec<(u32, u32, &ServerConfig)> = servers
        .iter()
        .map(|server| {
            let effective = u32::from(server.priority).saturating_add(scores.get(server));
            let tiebreak = *tiebreaks
                .entry(server.identity())
                .or_insert_with(|| rng.next_u32());
            (effective, tiebreak, server)
        })
        .collect();

    ranked.sort_by_key(|&(effective, tiebreak, _)| (effective, tiebreak));
    ranked.into_iter().map(|(_, _, server)| server).collect()
}
