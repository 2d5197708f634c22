//! Channel URI canonicalisation.
//!
//! A channel URI has the shape `prefix?key=value|key=value`. Recordings
//! are indexed and filtered by the *stripped* form, which drops the
//! qualifiers that identify one particular publisher session rather than
//! the stream itself, so that the same stream recorded twice lists under
//! one name.

/// Parameters removed by [`strip_channel`].
pub const SESSION_QUALIFIERS: [&str; 4] = ["session-id", "tag", "tags", "alias"];

/// Remove session qualifiers from a channel URI.
///
/// Remaining parameters keep their original order. If nothing remains the
/// `?` is dropped too.
///
/// ```
/// use reel_core::strip_channel;
///
/// assert_eq!(
///     strip_channel("aeron:udp?endpoint=localhost:40123|session-id=6|mtu=1408"),
///     "aeron:udp?endpoint=localhost:40123|mtu=1408",
/// );
/// assert_eq!(strip_channel("channelA?tag=f"), "channelA");
/// assert_eq!(strip_channel("aeron:ipc"), "aeron:ipc");
/// ```
pub fn strip_channel(channel: &str) -> String {
    let Some((prefix, params)) = channel.split_once('?') else {
        return channel.to_string();
    };

    let kept: Vec<&str> = params
        .split('|')
        .filter(|param| !param.is_empty())
        .filter(|param| {
            let key = param.split_once('=').map_or(*param, |(k, _)| k);
            !SESSION_QUALIFIERS.contains(&key)
        })
        .collect();

    if kept.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix}?{}", kept.join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn plain_channel_is_unchanged() {
        assert_eq!(strip_channel("channel"), "channel");
        assert_eq!(strip_channel("aeron:udp?endpoint=host:1"), "aeron:udp?endpoint=host:1");
    }

    #[test]
    fn all_qualifiers_removed() {
        assert_eq!(
            strip_channel("aeron:udp?alias=x|endpoint=h:1|tags=1,2|session-id=9"),
            "aeron:udp?endpoint=h:1"
        );
    }

    #[test]
    fn empty_params_collapse() {
        assert_eq!(strip_channel("aeron:ipc?"), "aeron:ipc");
        assert_eq!(strip_channel("aeron:ipc?session-id=1|"), "aeron:ipc");
    }

    proptest! {
        #[test]
        fn stripping_is_idempotent(
            prefix in "[a-z:]{1,12}",
            params in prop::collection::vec(("[a-z-]{1,10}", "[a-z0-9]{0,6}"), 0..6),
        ) {
            let uri = if params.is_empty() {
                prefix
            } else {
                let joined: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
                format!("{prefix}?{}", joined.join("|"))
            };
            let once = strip_channel(&uri);
            prop_assert_eq!(strip_channel(&once), once.clone());
            for q in SESSION_QUALIFIERS {
                let needle = format!("{q}=");
                let has_qualifier = once
                    .split_once('?')
                    .map(|(_, p)| p.split('|').any(|param| param.starts_with(&needle)))
                    .unwrap_or(false);
                prop_assert!(!has_qualifier);
            }
        }
    }
}
