use std::collections::BTreeMap;

use types::{
    leaderboards::{
        BuilderLeaderboard, BuilderRow, DepositorLeaderboard, DepositorRow, OperatorLeaderboard,
        OperatorRow, RelayLeaderboard, RelayRow,
    },
    primitives::ExecutionAddress,
    pubkey::Pubkey,
    reference::{BuilderEntry, Depositors, OperatorNames},
    snapshots::{BlockRecord, OperatorPubkeysSnapshot, ValidatorPubkeysSnapshot},
};

use crate::{
    joined::JoinedSnapshots,
    ranking::{rank, MarketShares, MissTally},
};

/// Ranks known builders by misses of the blocks they built. Fee recipients
/// that match no known builder are bucketed under their own address, so
/// every proposed block lands in exactly one bucket. Buckets without a
/// counted miss contribute to the share denominator but get no row.
#[must_use]
pub fn builder_report(
    joined: &JoinedSnapshots,
    builders: &[BuilderEntry],
    min_share: f64,
) -> BuilderLeaderboard {
    let mut shares = MarketShares::new();
    shares.grow_denominator(joined.blocks.blocks.len() as u64);

    for block in &joined.blocks.blocks {
        if let Some(fee_recipient) = block.fee_recipient {
            shares.record(&builder_bucket(fee_recipient, builders));
        }
    }

    let mut misses = MissTally::new();

    for (_, block) in joined.attributed_misses() {
        if let Some(fee_recipient) = block.fee_recipient {
            misses.record(&builder_bucket(fee_recipient, builders));
        }
    }

    let window = joined.window();

    BuilderLeaderboard {
        fetched_from: window.from,
        fetched_to: window.to,
        builder_leaderboard: rank(misses.entities(), &shares, &misses, Some(min_share))
            .into_iter()
            .map(|ranked| BuilderRow {
                builder: ranked.entity,
                num_misses: ranked.num_misses,
                market_share: ranked.market_share,
                weighted_num_misses: ranked.weighted_num_misses,
            })
            .collect(),
    }
}

/// Ranks relays by misses of the payloads they delivered. A miss in a slot
/// delivered by several relays counts against each of them.
#[must_use]
pub fn relay_report(joined: &JoinedSnapshots, min_share: f64) -> RelayLeaderboard {
    let mut shares = MarketShares::new();
    shares.grow_denominator(joined.blocks.blocks.len() as u64);

    for relays in joined.relays.relays.values() {
        for relay in relays {
            shares.record(relay);
        }
    }

    let mut misses = MissTally::new();

    for (miss, _) in joined.attributed_misses() {
        if let Some(relays) = joined.relays.relays.get(&miss.slot) {
            for relay in relays {
                misses.record(relay);
            }
        }
    }

    let window = joined.window();

    RelayLeaderboard {
        fetched_from: window.from,
        fetched_to: window.to,
        relay_leaderboard: rank(misses.entities(), &shares, &misses, Some(min_share))
            .into_iter()
            .map(|ranked| RelayRow {
                relay: ranked.entity,
                num_misses: ranked.num_misses,
                market_share: ranked.market_share,
                weighted_num_misses: ranked.weighted_num_misses,
            })
            .collect(),
    }
}

/// Ranks depositing entities by misses of blocks their validators proposed.
/// Shares are relative to proposed blocks only; missed slots have no
/// proposer to attribute.
#[must_use]
pub fn depositor_report(
    joined: &JoinedSnapshots,
    validator_pubkeys: &ValidatorPubkeysSnapshot,
    depositors: &Depositors,
    min_share: f64,
) -> DepositorLeaderboard {
    let resolve = |block: &BlockRecord| {
        let pubkey = proposer_pubkey(block, validator_pubkeys)?;
        depositors.get(pubkey).map(String::as_str)
    };

    let (shares, misses) = tally_proposers(joined, resolve);

    let window = joined.window();

    DepositorLeaderboard {
        fetched_from: window.from,
        fetched_to: window.to,
        depositor_leaderboard: rank(misses.entities(), &shares, &misses, Some(min_share))
            .into_iter()
            .map(|ranked| DepositorRow {
                depositor: ranked.entity,
                num_misses: ranked.num_misses,
                market_share: ranked.market_share,
                weighted_num_misses: ranked.weighted_num_misses,
            })
            .collect(),
    }
}

/// Ranks named staking operators by misses of blocks their validators
/// proposed. Every named operator is included, with a zero share if none of
/// its validators proposed this window, and no minimum-share filter applies.
#[must_use]
pub fn operator_report(
    joined: &JoinedSnapshots,
    validator_pubkeys: &ValidatorPubkeysSnapshot,
    operator_pubkeys: &OperatorPubkeysSnapshot,
    operator_names: &OperatorNames,
) -> OperatorLeaderboard {
    let mut names_by_pubkey = BTreeMap::new();

    for (operator_id, pubkeys) in &operator_pubkeys.operator_pubkeys {
        // Operators absent from the names file fall back to their id.
        let name = operator_names
            .names
            .get(operator_id)
            .cloned()
            .unwrap_or_else(|| operator_id.to_string());

        for pubkey in pubkeys {
            names_by_pubkey.insert(pubkey, name.clone());
        }
    }

    let resolve = |block: &BlockRecord| {
        let pubkey = proposer_pubkey(block, validator_pubkeys)?;
        names_by_pubkey.get(pubkey).map(String::as_str)
    };

    let (mut shares, misses) = tally_proposers(joined, resolve);

    for name in operator_names.names.values() {
        shares.register(name);
    }

    let window = joined.window();

    OperatorLeaderboard {
        fetched_from: window.from,
        fetched_to: window.to,
        operator_leaderboard: rank(shares.entities(), &shares, &misses, None)
            .into_iter()
            .map(|ranked| OperatorRow {
                operator: ranked.entity,
                num_misses: ranked.num_misses,
                market_share: ranked.market_share,
                weighted_num_misses: ranked.weighted_num_misses,
            })
            .collect(),
    }
}

fn builder_bucket(fee_recipient: ExecutionAddress, builders: &[BuilderEntry]) -> String {
    let address = format!("{fee_recipient:#x}");

    builders
        .iter()
        .find(|builder| {
            builder
                .fee_recipients
                .iter()
                .any(|prefix| address.starts_with(&prefix.to_lowercase()))
        })
        .map(|builder| builder.name.clone())
        .unwrap_or(address)
}

fn proposer_pubkey<'snapshot>(
    block: &BlockRecord,
    validator_pubkeys: &'snapshot ValidatorPubkeysSnapshot,
) -> Option<&'snapshot Pubkey> {
    validator_pubkeys.pubkeys.get(&block.proposer_index?)
}

fn tally_proposers<'snapshot>(
    joined: &'snapshot JoinedSnapshots,
    resolve: impl Fn(&BlockRecord) -> Option<&'snapshot str>,
) -> (MarketShares, MissTally) {
    let mut shares = MarketShares::new();
    let mut misses = MissTally::new();

    for block in &joined.blocks.blocks {
        if block.missed {
            continue;
        }

        shares.grow_denominator(1);

        if let Some(entity) = resolve(block) {
            shares.record(entity);
        }
    }

    for (_, block) in joined.attributed_misses() {
        if let Some(entity) = resolve(block) {
            misses.record(entity);
        }
    }

    (shares, misses)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use types::{
        primitives::{FetchWindow, Slot, ValidatorIndex, H256},
        snapshots::{BlocksSnapshot, MissEvent, RelaysSnapshot, TxRecord, TxsSnapshot},
    };

    use super::*;

    const WINDOW: FetchWindow = FetchWindow::new(1_000, 2_000);

    fn pubkey(byte: u8) -> Pubkey {
        Pubkey::from_bytes(&[byte; Pubkey::LENGTH])
    }

    fn block_hash(slot: Slot) -> H256 {
        H256::from_low_u64_be(slot)
    }

    fn proposed_block(
        slot: Slot,
        fee_recipient_byte: u8,
        proposer_index: ValidatorIndex,
    ) -> BlockRecord {
        BlockRecord {
            slot,
            missed: false,
            block_number: Some(slot),
            block_hash: Some(block_hash(slot)),
            fee_recipient: Some(ExecutionAddress::repeat_byte(fee_recipient_byte)),
            proposer_index: Some(proposer_index),
        }
    }

    fn miss(slot: Slot) -> MissEvent {
        MissEvent {
            block_hash: block_hash(slot),
            slot,
            proposal_time: WINDOW.from + slot,
        }
    }

    /// 10 slots, slots 3 and 7 missed. Validator 0 proposes even slots
    /// except 8, validator 1 proposes the rest. One transaction was missed
    /// twice by validator 0's blocks.
    fn scenario() -> anyhow::Result<JoinedSnapshots> {
        let blocks = (0..10)
            .map(|slot| match slot {
                3 | 7 => BlockRecord::missed(slot),
                0 | 2 | 4 => proposed_block(slot, 0xaa, 0),
                _ => proposed_block(slot, 0xbb, 1),
            })
            .collect();

        let txs = vec![TxRecord {
            tx_hash: H256::repeat_byte(1),
            misses: vec![miss(0), miss(2)],
        }];

        let relays = (0..10)
            .filter(|slot| *slot != 3 && *slot != 7)
            .map(|slot| {
                let relays = if slot < 5 {
                    vec!["aestus".to_owned()]
                } else {
                    vec!["titan".to_owned(), "ultrasound".to_owned()]
                };

                (slot, relays)
            })
            .collect();

        JoinedSnapshots::new(
            TxsSnapshot {
                fetched_from: WINDOW.from,
                fetched_to: WINDOW.to,
                propagation_time: 8,
                min_num_misses: 2,
                txs,
            },
            BlocksSnapshot {
                fetched_from: WINDOW.from,
                fetched_to: WINDOW.to,
                blocks,
            },
            RelaysSnapshot {
                fetched_from: WINDOW.from,
                fetched_to: WINDOW.to,
                relays,
            },
        )
    }

    fn validator_pubkeys() -> ValidatorPubkeysSnapshot {
        ValidatorPubkeysSnapshot {
            fetched_at_slot: 100,
            pubkeys: BTreeMap::from([(0, pubkey(0x10)), (1, pubkey(0x20))]),
        }
    }

    #[test]
    fn builder_rows_need_a_miss_but_shares_cover_all_buckets() -> anyhow::Result<()> {
        let joined = scenario()?;

        let builders = vec![BuilderEntry {
            name: "Alpha".to_owned(),
            // Prefixes are matched case-insensitively.
            fee_recipients: vec!["0xAAAA".to_owned()],
        }];

        let report = builder_report(&joined, &builders, 0.0);

        assert_eq!(report.fetched_from, WINDOW.from);
        assert_eq!(report.fetched_to, WINDOW.to);

        // The unknown fee recipient 0xbb.. has no counted miss, so its
        // fallback bucket gets no row even though it diluted Alpha's share.
        assert_eq!(report.builder_leaderboard.len(), 1);

        let alpha = &report.builder_leaderboard[0];

        assert_eq!(alpha.builder, "Alpha");
        assert_eq!(alpha.num_misses, 2);
        assert_eq!(alpha.market_share, 0.3);

        Ok(())
    }

    #[test]
    fn relay_misses_count_against_every_delivering_relay() -> anyhow::Result<()> {
        let mut joined = scenario()?;

        // Slot 6 was delivered by both titan and ultrasound.
        joined.txs.txs.push(TxRecord {
            tx_hash: H256::repeat_byte(2),
            misses: vec![miss(6)],
        });

        let report = relay_report(&joined, 0.0);

        let by_name = report
            .relay_leaderboard
            .iter()
            .map(|row| (row.relay.as_str(), row))
            .collect::<BTreeMap<_, _>>();

        assert_eq!(by_name.len(), 3);
        assert_eq!(by_name["aestus"].num_misses, 2);
        assert_eq!(by_name["aestus"].market_share, 0.4);
        assert_eq!(by_name["titan"].num_misses, 1);
        assert_eq!(by_name["ultrasound"].num_misses, 1);

        Ok(())
    }

    #[test]
    fn relays_without_misses_get_no_row() -> anyhow::Result<()> {
        let joined = scenario()?;

        let report = relay_report(&joined, 0.0);

        // Both misses happened in slots delivered by aestus alone, so titan
        // and ultrasound are absent despite their shares.
        assert_eq!(report.relay_leaderboard.len(), 1);
        assert_eq!(report.relay_leaderboard[0].relay, "aestus");

        Ok(())
    }

    #[test]
    fn depositor_shares_use_proposed_blocks_only() -> anyhow::Result<()> {
        let joined = scenario()?;

        let depositors = Depositors::from([
            (pubkey(0x10), "X".to_owned()),
            (pubkey(0x20), "Y".to_owned()),
        ]);

        let report = depositor_report(&joined, &validator_pubkeys(), &depositors, 0.0);

        // "Y" proposed blocks but missed nothing, so only "X" gets a row.
        assert_eq!(report.depositor_leaderboard.len(), 1);

        let x = &report.depositor_leaderboard[0];

        // 3 of the 8 proposed blocks, 2 misses.
        assert_eq!(x.depositor, "X");
        assert_eq!(x.num_misses, 2);
        assert_eq!(x.market_share, 0.375);
        assert!((x.weighted_num_misses - 2.0 / 0.375 / 100.0).abs() < 1e-12);

        Ok(())
    }

    #[test]
    fn operator_report_includes_idle_named_operators() -> anyhow::Result<()> {
        let joined = scenario()?;

        let operator_pubkeys = OperatorPubkeysSnapshot {
            fetched_until_block: 20_000_000,
            operator_pubkeys: BTreeMap::from([
                (1, BTreeSet::from([pubkey(0x10)])),
                (2, BTreeSet::from([pubkey(0x77)])),
            ]),
        };

        let operator_names = OperatorNames {
            names: BTreeMap::from([
                (1, "Staking Facilities".to_owned()),
                (2, "RockLogic".to_owned()),
            ]),
        };

        let report = operator_report(
            &joined,
            &validator_pubkeys(),
            &operator_pubkeys,
            &operator_names,
        );

        assert_eq!(report.operator_leaderboard.len(), 2);

        let active = &report.operator_leaderboard[0];

        assert_eq!(active.operator, "Staking Facilities");
        assert_eq!(active.num_misses, 2);
        assert_eq!(active.market_share, 0.375);

        let idle = &report.operator_leaderboard[1];

        assert_eq!(idle.operator, "RockLogic");
        assert_eq!(idle.num_misses, 0);
        assert_eq!(idle.market_share, 0.0);
        assert_eq!(idle.weighted_num_misses, 0.0);

        Ok(())
    }
}
