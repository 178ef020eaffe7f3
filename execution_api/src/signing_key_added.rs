use anyhow::{ensure, Result};
use types::{primitives::OperatorId, pubkey::Pubkey};

use crate::api::LogEntry;

/// Curated staking module of the Lido registry on mainnet.
pub const CURATED_MODULE_ADDRESS: &str = "0x55032650b14df07b85bf18a3a3ec8e0af2e028d5";

/// `keccak256("SigningKeyAdded(uint256,bytes)")`
pub const SIGNING_KEY_ADDED_TOPIC: &str =
    "0xc77a17d6b857abe6d6e6c37301621bc72c4dd52fa8830fb54dfa715c04911a89";

pub const CURATED_MODULE_DEPLOY_BLOCK: u64 = 11_473_216;

const WORD_SIZE: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SigningKeyAdded {
    pub operator_id: OperatorId,
    pub pubkey: Pubkey,
}

impl SigningKeyAdded {
    /// Decodes a `SigningKeyAdded(uint256 indexed operatorId, bytes pubkey)`
    /// log. The pubkey is ABI-encoded as a dynamic `bytes` value: one offset
    /// word, one length word, then the bytes padded to a word boundary.
    pub fn from_log(log: &LogEntry) -> Result<Self> {
        ensure!(
            log.topics.len() >= 2,
            "SigningKeyAdded log is missing the operator id topic",
        );

        let id_word = log.topics[1].as_bytes();

        ensure!(
            id_word[..WORD_SIZE - 8].iter().all(|byte| *byte == 0),
            "operator id does not fit in 64 bits: {:?}",
            log.topics[1],
        );

        let operator_id = OperatorId::from_be_bytes(
            id_word[WORD_SIZE - 8..]
                .try_into()
                .expect("slice is exactly 8 bytes long"),
        );

        let data = log.data_bytes()?;

        ensure!(
            data.len() >= 2 * WORD_SIZE,
            "SigningKeyAdded data is too short: {} bytes",
            data.len(),
        );

        let length = decode_length_word(&data[WORD_SIZE..2 * WORD_SIZE])?;

        ensure!(
            data.len() >= 2 * WORD_SIZE + length,
            "SigningKeyAdded data is shorter than its encoded length",
        );

        let pubkey = Pubkey::from_bytes(&data[2 * WORD_SIZE..2 * WORD_SIZE + length]);

        Ok(Self {
            operator_id,
            pubkey,
        })
    }
}

fn decode_length_word(word: &[u8]) -> Result<usize> {
    ensure!(
        word[..WORD_SIZE - 8].iter().all(|byte| *byte == 0),
        "encoded length does not fit in 64 bits",
    );

    let length = u64::from_be_bytes(
        word[WORD_SIZE - 8..]
            .try_into()
            .expect("slice is exactly 8 bytes long"),
    );

    Ok(usize::try_from(length)?)
}

#[cfg(test)]
mod tests {
    use types::primitives::H256;

    use super::*;

    fn encode_pubkey_data(pubkey_bytes: &[u8]) -> String {
        let mut data = vec![0; WORD_SIZE];
        data[WORD_SIZE - 1] = 0x20;

        let mut length_word = vec![0; WORD_SIZE];
        length_word[WORD_SIZE - 1] =
            u8::try_from(pubkey_bytes.len()).expect("test pubkeys are short");
        data.extend_from_slice(&length_word);

        data.extend_from_slice(pubkey_bytes);

        let padding = pubkey_bytes.len().next_multiple_of(WORD_SIZE) - pubkey_bytes.len();
        data.extend(core::iter::repeat_n(0, padding));

        format!("0x{}", hex::encode(data))
    }

    #[test]
    fn decodes_operator_id_and_pubkey() -> Result<()> {
        let pubkey_bytes = [0xab; Pubkey::LENGTH];

        let log = LogEntry {
            topics: vec![
                SIGNING_KEY_ADDED_TOPIC.parse()?,
                H256::from_low_u64_be(30),
            ],
            data: encode_pubkey_data(&pubkey_bytes),
            block_number: "0xaf1a40".to_owned(),
        };

        let event = SigningKeyAdded::from_log(&log)?;

        assert_eq!(event.operator_id, 30);
        assert_eq!(event.pubkey, Pubkey::from_bytes(&pubkey_bytes));

        Ok(())
    }

    #[test]
    fn rejects_logs_without_an_operator_id_topic() -> Result<()> {
        let log = LogEntry {
            topics: vec![SIGNING_KEY_ADDED_TOPIC.parse()?],
            data: encode_pubkey_data(&[0xab; Pubkey::LENGTH]),
            block_number: "0xaf1a40".to_owned(),
        };

        SigningKeyAdded::from_log(&log)
            .expect_err("logs without an operator id topic should be rejected");

        Ok(())
    }

    #[test]
    fn rejects_truncated_data() -> Result<()> {
        let log = LogEntry {
            topics: vec![
                SIGNING_KEY_ADDED_TOPIC.parse()?,
                H256::from_low_u64_be(30),
            ],
            data: format!("0x{}", "00".repeat(WORD_SIZE)),
            block_number: "0xaf1a40".to_owned(),
        };

        SigningKeyAdded::from_log(&log).expect_err("truncated data should be rejected");

        Ok(())
    }
}
