//! Engine wiring: one set of services over a pricing store and a rate store.

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::cache::PricingCache;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::fx::ExchangeRateResolver;
use crate::pricing::requests::{PriceRequest, QuotationRequest};
use crate::pricing::responses::{PriceResponse, QuotationResponse};
use crate::pricing::{OverlapValidator, PricingRecordService, PricingResolver, QuotationAggregator};
use crate::store::{
    InMemoryPricingStore, InMemoryRateStore, PgPricingStore, PricingRecordStore, RateHistoryStore,
};

#[derive(Clone)]
pub struct PricingEngine {
    pub records: PricingRecordService,
    pub overlap: OverlapValidator,
    pub resolver: PricingResolver,
    pub rates: ExchangeRateResolver,
    pub aggregator: QuotationAggregator,
}

impl PricingEngine {
    pub fn new(
        pricing_store: Arc<dyn PricingRecordStore>,
        rate_store: Arc<dyn RateHistoryStore>,
        cache: PricingCache,
    ) -> Self {
        let resolver = PricingResolver::new(pricing_store.clone());
        let rates = ExchangeRateResolver::new(rate_store, cache);
        Self {
            records: PricingRecordService::new(pricing_store.clone()),
            overlap: OverlapValidator::new(pricing_store),
            aggregator: QuotationAggregator::new(resolver.clone(), rates.clone()),
            resolver,
            rates,
        }
    }

    /// Engine over in-process stores.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryPricingStore::new()),
            Arc::new(InMemoryRateStore::new()),
            PricingCache::default(),
        )
    }

    /// Build the engine from configuration: Postgres when `DATABASE_URL` is
    /// set, in-memory stores otherwise.
    pub async fn connect(config: &EngineConfig) -> anyhow::Result<Self> {
        let cache = PricingCache::new(config.rate_cache_capacity, config.rate_cache_idle);

        let Some(url) = &config.database_url else {
            info!("DATABASE_URL not set, using in-memory pricing stores");
            return Ok(Self::new(
                Arc::new(InMemoryPricingStore::new()),
                Arc::new(InMemoryRateStore::new()),
                cache,
            ));
        };

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(url)
            .await
            .context("Failed to connect to the pricing database")?;
        info!(
            "Connected to pricing database (max {} connections)",
            config.max_connections
        );

        let store = Arc::new(PgPricingStore::new(pool));
        Ok(Self::new(store.clone(), store, cache))
    }

    /// Price a single service.
    pub async fn price(&self, request: PriceRequest) -> Result<PriceResponse> {
        let result = self
            .resolver
            .resolve_price(
                request.entity_id,
                request.date,
                request.service,
                request.quantity,
                &request.context,
            )
            .await?;
        Ok(result.into())
    }

    /// Price every line of a quotation and total it.
    pub async fn quote(&self, request: QuotationRequest) -> Result<QuotationResponse> {
        let target = request.target_currency().clone();
        let priced = self
            .aggregator
            .price_quotation(&request.items, &request.context, &target)
            .await?;
        Ok(priced.into())
    }
}
