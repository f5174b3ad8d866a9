use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use crate::database_ops::countries::{
    name_key, Country, CountryDraft, CountryFilter, CountryStore, GdpSort,
};
use crate::database_ops::db::Db;

const COLUMNS: &str = "id, name, capital, region, population, currency_code, \
     exchange_rate, estimated_gdp, flag_url, last_refreshed_at";

/// `countries` table access. Identity is the `name_key` unique column.
#[derive(Clone)]
pub struct PgCountryStore {
    pub db: Db,
}

impl PgCountryStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CountryStore for PgCountryStore {
    async fn upsert(&self, draft: &CountryDraft) -> Result<Country> {
        draft.validate()?;
        let sql = format!(
            "INSERT INTO countries (name, name_key, capital, region, population, currency_code, \
                 exchange_rate, estimated_gdp, flag_url, last_refreshed_at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9, now()) \
             ON CONFLICT (name_key) DO UPDATE SET \
                 name=EXCLUDED.name, capital=EXCLUDED.capital, region=EXCLUDED.region, \
                 population=EXCLUDED.population, currency_code=EXCLUDED.currency_code, \
                 exchange_rate=EXCLUDED.exchange_rate, estimated_gdp=EXCLUDED.estimated_gdp, \
                 flag_url=EXCLUDED.flag_url, last_refreshed_at=now() \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, Country>(&sql)
            .bind(&draft.name)
            .bind(draft.key())
            .bind(&draft.capital)
            .bind(&draft.region)
            .bind(draft.population)
            .bind(&draft.currency_code)
            .bind(&draft.exchange_rate)
            .bind(&draft.estimated_gdp)
            .bind(&draft.flag_url)
            .fetch_one(&self.db.pool)
            .await
            .with_context(|| format!("upsert country '{}'", draft.name))?;
        Ok(row)
    }

    async fn get(&self, name: &str) -> Result<Option<Country>> {
        let sql = format!("SELECT {COLUMNS} FROM countries WHERE name_key = $1");
        let row = sqlx::query_as::<_, Country>(&sql)
            .bind(name_key(name))
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(row)
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let res = sqlx::query("DELETE FROM countries WHERE name_key = $1")
            .bind(name_key(name))
            .execute(&self.db.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn list(&self, filter: &CountryFilter) -> Result<Vec<Country>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM countries WHERE TRUE"));
        if let Some(region) = &filter.region {
            qb.push(" AND lower(region) = ").push_bind(region.to_lowercase());
        }
        if let Some(currency) = &filter.currency {
            qb.push(" AND lower(currency_code) = ")
                .push_bind(currency.to_lowercase());
        }
        qb.push(match filter.sort {
            Some(GdpSort::Desc) => " ORDER BY estimated_gdp DESC NULLS LAST, name_key",
            Some(GdpSort::Asc) => " ORDER BY estimated_gdp ASC NULLS LAST, name_key",
            None => " ORDER BY name_key, id",
        });
        let rows = qb
            .build_query_as::<Country>()
            .fetch_all(&self.db.pool)
            .await?;
        Ok(rows)
    }

    async fn count(&self) -> Result<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT count(*) FROM countries")
            .fetch_one(&self.db.pool)
            .await?;
        Ok(n)
    }

    async fn top_by_gdp(&self, limit: usize) -> Result<Vec<Country>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM countries WHERE estimated_gdp IS NOT NULL \
             ORDER BY estimated_gdp DESC, name_key LIMIT $1"
        );
        let rows = sqlx::query_as::<_, Country>(&sql)
            .bind(limit as i64)
            .fetch_all(&self.db.pool)
            .await?;
        Ok(rows)
    }

    async fn last_refreshed_at(&self) -> Result<Option<DateTime<Utc>>> {
        let ts = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            "SELECT max(last_refreshed_at) FROM countries",
        )
        .fetch_one(&self.db.pool)
        .await?;
        Ok(ts)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query_scalar::<_, bool>("SELECT true")
            .fetch_one(&self.db.pool)
            .await?;
        Ok(())
    }
}
