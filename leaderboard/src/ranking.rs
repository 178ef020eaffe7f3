use hashlink::LinkedHashMap;

/// Per-entity block counts over a shared denominator. Entities keep the
/// order in which they were first recorded so that later ties in the ranking
/// are broken deterministically.
#[derive(Default)]
pub struct MarketShares {
    counts: LinkedHashMap<String, u64>,
    denominator: u64,
}

impl MarketShares {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `entity` appear in the ranking even if it never proposed a
    /// block this window.
    pub fn register(&mut self, entity: &str) {
        if !self.counts.contains_key(entity) {
            self.counts.insert(entity.to_owned(), 0);
        }
    }

    pub fn record(&mut self, entity: &str) {
        *self.counts.entry(entity.to_owned()).or_insert(0) += 1;
    }

    pub fn grow_denominator(&mut self, blocks: u64) {
        self.denominator += blocks;
    }

    #[must_use]
    pub fn share_of(&self, entity: &str) -> f64 {
        if self.denominator == 0 {
            return 0.0;
        }

        let count = self.counts.get(entity).copied().unwrap_or_default();

        count as f64 / self.denominator as f64
    }

    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }
}

#[derive(Default)]
pub struct MissTally {
    counts: LinkedHashMap<String, u64>,
}

impl MissTally {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entity: &str) {
        *self.counts.entry(entity.to_owned()).or_insert(0) += 1;
    }

    #[must_use]
    pub fn misses_of(&self, entity: &str) -> u64 {
        self.counts.get(entity).copied().unwrap_or_default()
    }

    /// Entities in the order their first miss was recorded.
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RankedEntity {
    pub entity: String,
    pub num_misses: u64,
    pub market_share: f64,
    pub weighted_num_misses: f64,
}

/// Ranks `entities` by raw miss count, descending, ties in encounter order.
/// Callers pick the candidates: entities with at least one counted miss for
/// most reports, or every known entity for rankings that keep idle ones.
///
/// Entities below `min_share` are dropped entirely. Entities with a zero
/// share get a weighted count of zero rather than a non-finite value.
#[must_use]
pub fn rank<'entities>(
    entities: impl IntoIterator<Item = &'entities str>,
    shares: &MarketShares,
    misses: &MissTally,
    min_share: Option<f64>,
) -> Vec<RankedEntity> {
    let mut ranked = entities
        .into_iter()
        .map(|entity| {
            let num_misses = misses.misses_of(entity);
            let market_share = shares.share_of(entity);

            let weighted_num_misses = if market_share > 0.0 {
                num_misses as f64 / market_share / 100.0
            } else {
                0.0
            };

            RankedEntity {
                entity: entity.to_owned(),
                num_misses,
                market_share,
                weighted_num_misses,
            }
        })
        .filter(|entity| min_share.is_none_or(|minimum| entity.market_share >= minimum))
        .collect::<Vec<_>>();

    ranked.sort_by(|a, b| b.num_misses.cmp(&a.num_misses));

    ranked
}
