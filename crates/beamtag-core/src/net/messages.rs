//! The wire message catalogue.
//!
//! Each kind pairs a recognition pattern with a construction template. Kinds
//! used in only one direction carry only the half they need: gun telemetry is
//! parse-only, gun commands are build-only. The catalogue holds one static
//! instance per kind so dispatch tables can refer to kinds by identity.

use std::sync::LazyLock;

use regex::Regex;

use super::protocol::ProtocolError;

/// One positional field for [`MessageKind::build`].
#[derive(Debug, Clone, Copy)]
pub enum Arg<'a> {
    Num(u32),
    Text(&'a str),
}

/// A wire message definition: how to recognize it and how to construct it.
pub struct MessageKind {
    name: &'static str,
    pattern: Option<Regex>,
    template: Option<&'static str>,
}

impl MessageKind {
    pub(crate) fn new(
        name: &'static str,
        pattern: Option<&str>,
        template: Option<&'static str>,
    ) -> Self {
        let pattern =
            pattern.map(|p| Regex::new(&format!("^{p}$")).expect("message pattern compiles"));
        Self { name, pattern, template }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Match a whole line against this kind, returning captured fields in
    /// pattern order. `None` covers both no-match and pattern-less kinds;
    /// neither is an error. An optional group that matched nothing captures
    /// the empty string.
    pub fn parse<'l>(&self, line: &'l str) -> Option<Vec<&'l str>> {
        let caps = self.pattern.as_ref()?.captures(line)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|group| group.map_or("", |m| m.as_str()))
                .collect(),
        )
    }

    pub fn is_match(&self, line: &str) -> bool {
        self.pattern.as_ref().is_some_and(|p| p.is_match(line))
    }

    /// Render the construction template with positional fields: `%d` takes
    /// [`Arg::Num`] as decimal, `%s` takes [`Arg::Text`] verbatim. Text is
    /// not escaped, so it must not contain a newline.
    pub fn build(&self, args: &[Arg<'_>]) -> Result<String, ProtocolError> {
        let Some(template) = self.template else {
            return Err(ProtocolError::NotConstructible(self.name));
        };
        let expected = template.matches('%').count();
        if args.len() != expected {
            return Err(ProtocolError::WrongArgCount {
                kind: self.name,
                expected,
                got: args.len(),
            });
        }
        let mut out = String::with_capacity(template.len() + 8);
        let mut next_arg = 0;
        let mut chars = template.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match (chars.next(), args.get(next_arg)) {
                (Some('d'), Some(Arg::Num(n))) => out.push_str(&n.to_string()),
                (Some('s'), Some(Arg::Text(s))) => out.push_str(s),
                _ => {
                    return Err(ProtocolError::WrongArgType {
                        kind: self.name,
                        index: next_arg,
                    });
                },
            }
            next_arg += 1;
        }
        Ok(out)
    }
}

/// Parse the field at `idx` as a decimal integer. A `\d*` group that matched
/// nothing yields `None`.
pub fn num_field(fields: &[&str], idx: usize) -> Option<u32> {
    fields.get(idx)?.parse().ok()
}

// Client -> authority

/// Echo of a raw line the gun sent to the client.
pub static RECV: LazyLock<MessageKind> = LazyLock::new(|| {
    MessageKind::new("Recv", Some(r"Recv\((\d*),(\d*),(.*)\)"), Some("Recv(%d,%d,%s)"))
});

/// Echo of a raw line the client sent to the gun.
pub static SENT: LazyLock<MessageKind> = LazyLock::new(|| {
    MessageKind::new("Sent", Some(r"Sent\((\d*),(\d*),(.*)\)"), Some("Sent(%d,%d,%s)"))
});

/// A client announcing itself, expecting a team/player assignment back.
pub static HELLO: LazyLock<MessageKind> =
    LazyLock::new(|| MessageKind::new("Hello", Some(r"Hello\(\)"), Some("Hello()")));

// Authority -> client

/// Identity assignment: team id (one digit), then player id.
pub static TEAM_PLAYER: LazyLock<MessageKind> = LazyLock::new(|| {
    MessageKind::new("TeamPlayer", Some(r"TeamPlayer\((\d),(\d+)\)"), Some("TeamPlayer(%d,%d)"))
});

/// Start the match clock; the duration field may be empty.
pub static START_GAME: LazyLock<MessageKind> = LazyLock::new(|| {
    MessageKind::new("StartGame", Some(r"StartGame\((\d*)\)"), Some("StartGame(%d)"))
});

pub static STOP_GAME: LazyLock<MessageKind> =
    LazyLock::new(|| MessageKind::new("StopGame", Some(r"StopGame\(\)"), Some("StopGame()")));

pub static RESET_GAME: LazyLock<MessageKind> =
    LazyLock::new(|| MessageKind::new("ResetGame", Some(r"ResetGame\(\)"), Some("ResetGame()")));

/// The authority removed this player from the roster.
pub static DELETED: LazyLock<MessageKind> =
    LazyLock::new(|| MessageKind::new("Deleted", Some(r"Deleted\(\)"), Some("Deleted()")));

// Gun -> client (parse-only telemetry)

/// An incoming shot: source team, source player, damage.
pub static HIT: LazyLock<MessageKind> =
    LazyLock::new(|| MessageKind::new("Hit", Some(r"H(\d),(\d),(\d)"), None));

/// Full-ammo pickup token.
pub static FULL_AMMO: LazyLock<MessageKind> =
    LazyLock::new(|| MessageKind::new("FullAmmo", Some("FA"), None));

/// The gun received a shot it could not decode.
pub static CORRUPT: LazyLock<MessageKind> =
    LazyLock::new(|| MessageKind::new("Corrupt", Some("C"), None));

/// Handshake ack from the gun.
pub static CLIENT_CONNECTED: LazyLock<MessageKind> =
    LazyLock::new(|| MessageKind::new("ClientConnected", Some("c"), None));

pub static CLIENT_DISCONNECTED: LazyLock<MessageKind> =
    LazyLock::new(|| MessageKind::new("ClientDisconnected", Some("d"), None));

pub static TRIGGER: LazyLock<MessageKind> =
    LazyLock::new(|| MessageKind::new("Trigger", Some("T"), None));

pub static TRIGGER_RELEASE: LazyLock<MessageKind> =
    LazyLock::new(|| MessageKind::new("TriggerRelease", Some("t"), None));

/// Battery level report, one digit.
pub static BATTERY: LazyLock<MessageKind> =
    LazyLock::new(|| MessageKind::new("Battery", Some(r"B(\d)"), None));

// Client -> gun (build-only commands)

/// Handshake request to the gun.
pub static CLIENT_CONNECT: LazyLock<MessageKind> =
    LazyLock::new(|| MessageKind::new("ClientConnect", None, Some("c")));

pub static CLIENT_DISCONNECT: LazyLock<MessageKind> =
    LazyLock::new(|| MessageKind::new("ClientDisconnect", None, Some("d")));

/// Arm an outgoing shot: team, player, damage.
pub static FIRE: LazyLock<MessageKind> =
    LazyLock::new(|| MessageKind::new("Fire", None, Some("Fire(%d,%d,%d)")));

#[cfg(test)]
mod tests {
    use super::*;

    // ================================================================
    // Parsing
    // ================================================================

    #[test]
    fn hello_matches_exactly() {
        assert_eq!(HELLO.parse("Hello()"), Some(vec![]));
        assert_eq!(HELLO.parse("hello()"), None);
        assert_eq!(HELLO.parse("Hello() "), None);
        assert_eq!(HELLO.parse("xHello()"), None);
    }

    #[test]
    fn hit_captures_single_digits() {
        assert_eq!(HIT.parse("H1,2,3"), Some(vec!["1", "2", "3"]));
        assert_eq!(HIT.parse("H12,2,3"), None);
        assert_eq!(HIT.parse("H1,2"), None);
    }

    #[test]
    fn team_player_takes_one_digit_team_and_multi_digit_player() {
        assert_eq!(TEAM_PLAYER.parse("TeamPlayer(1,23)"), Some(vec!["1", "23"]));
        assert_eq!(TEAM_PLAYER.parse("TeamPlayer(2,5)"), Some(vec!["2", "5"]));
        assert_eq!(TEAM_PLAYER.parse("TeamPlayer(10,5)"), None);
        assert_eq!(TEAM_PLAYER.parse("TeamPlayer(1,)"), None);
    }

    #[test]
    fn start_game_duration_may_be_empty() {
        assert_eq!(START_GAME.parse("StartGame(120)"), Some(vec!["120"]));
        assert_eq!(START_GAME.parse("StartGame()"), Some(vec![""]));
        assert_eq!(START_GAME.parse("StartGame(-1)"), None);
    }

    #[test]
    fn recv_keeps_commas_and_parens_in_payload() {
        assert_eq!(RECV.parse("Recv(1,2,H1,2,3)"), Some(vec!["1", "2", "H1,2,3"]));
        assert_eq!(RECV.parse("Recv(,,raw)"), Some(vec!["", "", "raw"]));
        assert_eq!(RECV.parse("Recv(1,2,)"), Some(vec!["1", "2", ""]));
    }

    #[test]
    fn single_letter_kinds_are_case_sensitive() {
        assert!(CLIENT_CONNECTED.is_match("c"));
        assert!(!CLIENT_CONNECTED.is_match("C"));
        assert!(CORRUPT.is_match("C"));
        assert!(TRIGGER.is_match("T"));
        assert!(TRIGGER_RELEASE.is_match("t"));
        assert!(!TRIGGER.is_match("t"));
    }

    #[test]
    fn battery_captures_level() {
        assert_eq!(BATTERY.parse("B7"), Some(vec!["7"]));
        assert_eq!(BATTERY.parse("B77"), None);
    }

    #[test]
    fn build_only_kinds_never_parse() {
        assert_eq!(FIRE.parse("Fire(1,2,3)"), None);
        assert!(!CLIENT_CONNECT.is_match("c"));
    }

    // ================================================================
    // Building
    // ================================================================

    #[test]
    fn build_substitutes_positional_fields() {
        let line = RECV
            .build(&[Arg::Num(1), Arg::Num(2), Arg::Text("H1,2,3")])
            .unwrap();
        assert_eq!(line, "Recv(1,2,H1,2,3)");

        let fire = FIRE.build(&[Arg::Num(1), Arg::Num(2), Arg::Num(1)]).unwrap();
        assert_eq!(fire, "Fire(1,2,1)");
    }

    #[test]
    fn build_without_fields_renders_template_verbatim() {
        assert_eq!(CLIENT_CONNECT.build(&[]).unwrap(), "c");
        assert_eq!(STOP_GAME.build(&[]).unwrap(), "StopGame()");
    }

    #[test]
    fn parse_only_kinds_refuse_build() {
        assert!(matches!(
            HIT.build(&[Arg::Num(1), Arg::Num(2), Arg::Num(3)]),
            Err(ProtocolError::NotConstructible("Hit"))
        ));
    }

    #[test]
    fn build_rejects_wrong_arity() {
        assert!(matches!(
            RECV.build(&[Arg::Num(1)]),
            Err(ProtocolError::WrongArgCount { kind: "Recv", expected: 3, got: 1 })
        ));
        assert!(matches!(
            HELLO.build(&[Arg::Num(1)]),
            Err(ProtocolError::WrongArgCount { .. })
        ));
    }

    #[test]
    fn build_rejects_wrong_field_type() {
        assert!(matches!(
            RECV.build(&[Arg::Text("x"), Arg::Num(2), Arg::Text("y")]),
            Err(ProtocolError::WrongArgType { kind: "Recv", index: 0 })
        ));
        assert!(matches!(
            FIRE.build(&[Arg::Num(1), Arg::Num(2), Arg::Text("3")]),
            Err(ProtocolError::WrongArgType { index: 2, .. })
        ));
    }

    #[test]
    fn dual_kinds_roundtrip_through_their_own_pattern() {
        let cases: &[(&MessageKind, &[Arg<'_>], &[&str])] = &[
            (&RECV, &[Arg::Num(1), Arg::Num(2), Arg::Text("T")], &["1", "2", "T"]),
            (&SENT, &[Arg::Num(3), Arg::Num(14), Arg::Text("Fire(3,14,1)")], &["3", "14", "Fire(3,14,1)"]),
            (&HELLO, &[], &[]),
            (&TEAM_PLAYER, &[Arg::Num(2), Arg::Num(31)], &["2", "31"]),
            (&START_GAME, &[Arg::Num(120)], &["120"]),
            (&STOP_GAME, &[], &[]),
            (&RESET_GAME, &[], &[]),
            (&DELETED, &[], &[]),
        ];
        for (kind, args, expected) in cases {
            let line = kind.build(args).unwrap();
            let fields = kind
                .parse(&line)
                .unwrap_or_else(|| panic!("{} did not match its own build: {line}", kind.name()));
            assert_eq!(&fields, expected, "fields for {}", kind.name());
        }
    }

    #[test]
    fn num_field_handles_empty_captures() {
        assert_eq!(num_field(&["12", ""], 0), Some(12));
        assert_eq!(num_field(&["12", ""], 1), None);
        assert_eq!(num_field(&["12"], 5), None);
    }

    // ================================================================
    // Property-based tests (proptest)
    // ================================================================

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn team_player_roundtrips_valid_identities(team in 1u32..=7, player in 1u32..=32) {
                let line = TEAM_PLAYER.build(&[Arg::Num(team), Arg::Num(player)]).unwrap();
                let fields = TEAM_PLAYER.parse(&line).unwrap();
                prop_assert_eq!(num_field(&fields, 0), Some(team));
                prop_assert_eq!(num_field(&fields, 1), Some(player));
            }

            #[test]
            fn recv_roundtrips_arbitrary_gun_lines(
                team in 1u32..=7,
                player in 1u32..=32,
                line in "[ -~]{0,30}",
            ) {
                let built = RECV
                    .build(&[Arg::Num(team), Arg::Num(player), Arg::Text(&line)])
                    .unwrap();
                let fields = RECV.parse(&built).unwrap();
                prop_assert_eq!(fields[2], line);
            }

            #[test]
            fn start_game_roundtrips_durations(duration in 0u32..=100_000) {
                let built = START_GAME.build(&[Arg::Num(duration)]).unwrap();
                let fields = START_GAME.parse(&built).unwrap();
                prop_assert_eq!(num_field(&fields, 0), Some(duration));
            }
        }
    }
}
