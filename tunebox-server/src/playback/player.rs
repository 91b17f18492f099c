//! Output device selection

use tracing::{debug, info};
use tunebox_common::models::Player;
use tunebox_common::{Error, Result};

use crate::media::MediaServer;

/// Pick the device playback commands go to
///
/// Prefers an exact name match with `preferred`, otherwise falls back to the
/// first device the server lists.
pub async fn resolve_active_player(
    media: &dyn MediaServer,
    preferred: Option<&str>,
) -> Result<Player> {
    let players = media.players().await?;
    choose_player(players, preferred)
}

fn choose_player(players: Vec<Player>, preferred: Option<&str>) -> Result<Player> {
    if let Some(name) = preferred {
        if let Some(player) = players.iter().find(|p| p.name == name) {
            debug!("Active player found: {}", player.name);
            return Ok(player.clone());
        }
        info!("No player named {}, falling back to the first player", name);
    }

    let player = players.into_iter().next().ok_or(Error::NoPlayersFound)?;
    debug!("Active player found: {}", player.name);
    Ok(player)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, name: &str) -> Player {
        Player {
            player_id: id.to_string(),
            name: name.to_string(),
            device: "Test".to_string(),
        }
    }

    #[test]
    fn test_prefers_configured_name() {
        let players = vec![player("1", "Kitchen"), player("2", "Living Room")];
        let chosen = choose_player(players, Some("Living Room")).unwrap();
        assert_eq!(chosen.player_id, "2");
    }

    #[test]
    fn test_falls_back_to_first() {
        let players = vec![player("1", "Kitchen"), player("2", "Living Room")];
        assert_eq!(choose_player(players.clone(), Some("Garage")).unwrap().player_id, "1");
        assert_eq!(choose_player(players, None).unwrap().player_id, "1");
    }

    #[test]
    fn test_empty_list_is_an_error() {
        assert!(matches!(
            choose_player(Vec::new(), Some("Kitchen")),
            Err(Error::NoPlayersFound)
        ));
    }
}
