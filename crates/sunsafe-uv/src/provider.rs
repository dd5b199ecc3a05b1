//! UV index lookups against the OpenUV-style HTTP API.

use std::time::Duration;

use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use sunsafe_core::{AppError, ReqwestErrorExt, ResilientExecutor, UvConfig};
use tracing::instrument;

use crate::cache::RequestCache;
use crate::types::{Coordinate, ProviderPayload, UvResponse};

const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// Roughly 111 km per degree of latitude
const KM_PER_DEGREE: f64 = 111.0;

/// Connection settings for [`UvClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub api_key: String,
    pub altitude_m: u32,
    pub request_timeout: Duration,
    pub cache_ttl: Duration,
}

impl ClientSettings {
    /// # Errors
    /// Fails when no API key is configured.
    pub fn from_config(config: &UvConfig) -> Result<Self, AppError> {
        Ok(Self {
            base_url: config.base_url.clone(),
            api_key: config.require_api_key()?.to_string(),
            altitude_m: config.altitude_m,
            request_timeout: config.request_timeout(),
            cache_ttl: config.cache_duration(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// One sampled point of a [`UvClient::survey_nearby`] call.
#[derive(Debug, Clone)]
pub struct SurveyPoint {
    pub name: String,
    pub coordinate: Coordinate,
    pub is_current: bool,
    pub result: Result<UvResponse, AppError>,
}

#[derive(Debug)]
pub struct UvClient {
    client: Client,
    settings: ClientSettings,
    cache: RequestCache,
    executor: ResilientExecutor,
}

impl UvClient {
    pub fn new(settings: ClientSettings, executor: ResilientExecutor) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| AppError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            cache: RequestCache::new(settings.cache_ttl),
            settings,
            executor,
        })
    }

    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }

    /// UV data for a coordinate, served from cache while fresh.
    ///
    /// # Errors
    /// `InvalidArgument` for bad coordinates (no request is made), otherwise
    /// the terminal failure reported by the executor.
    #[instrument(skip(self), level = "info")]
    pub async fn get_uv_data(&self, lat: f64, lng: f64) -> Result<UvResponse, AppError> {
        let coordinate = Coordinate::new(lat, lng)?;

        if let Some(cached) = self.cache.get(&coordinate) {
            return Ok(cached);
        }

        let payload = self.executor.run(|| self.fetch(coordinate)).await?;
        let response = payload.attach(coordinate);

        self.cache.put(&coordinate, response.clone());
        tracing::info!(
            "Fetched UV index {} for {}",
            response.result.uv,
            coordinate.cache_key()
        );
        Ok(response)
    }

    /// Look up the center and `count` points spread within `radius_km` of it.
    ///
    /// Points falling outside valid coordinate ranges are dropped. Each
    /// lookup fails independently.
    pub async fn survey_nearby(
        &self,
        center: Coordinate,
        radius_km: f64,
        count: usize,
    ) -> Vec<SurveyPoint> {
        let mut points = vec![("Your Location".to_string(), center, true)];
        points.extend(
            nearby_coordinates(center, radius_km, count)
                .into_iter()
                .enumerate()
                .map(|(i, c)| (format!("Point {}", i + 1), c, false)),
        );

        let lookups = points.iter().map(|(_, coordinate, _)| {
            self.get_uv_data(coordinate.latitude, coordinate.longitude)
        });
        let results = join_all(lookups).await;

        points
            .into_iter()
            .zip(results)
            .map(|((name, coordinate, is_current), result)| {
                if let Err(e) = &result {
                    tracing::warn!("UV lookup failed for {}: {}", name, e);
                }
                SurveyPoint {
                    name,
                    coordinate,
                    is_current,
                    result,
                }
            })
            .collect()
    }

    async fn fetch(&self, coordinate: Coordinate) -> Result<ProviderPayload, AppError> {
        let response = self
            .client
            .get(&self.settings.base_url)
            .header(ACCESS_TOKEN_HEADER, &self.settings.api_key)
            .header("Content-Type", "application/json")
            .query(&[
                ("lat", coordinate.latitude.to_string()),
                ("lng", coordinate.longitude.to_string()),
                ("alt", self.settings.altitude_m.to_string()),
            ])
            .send()
            .await
            .map_err(ReqwestErrorExt::into_app_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<ProviderErrorBody>().await.ok();
            let message = body
                .and_then(|b| b.message.or(b.error))
                .unwrap_or_else(|| format!("HTTP Error {}", status.as_u16()));
            return Err(AppError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<ProviderPayload>()
            .await
            .map_err(ReqwestErrorExt::into_app_error)
    }
}

/// Points spread around `center` on a golden-angle spiral, all within
/// `radius_km`. Invalid coordinates (past a pole or the antimeridian) are
/// skipped.
pub fn nearby_coordinates(center: Coordinate, radius_km: f64, count: usize) -> Vec<Coordinate> {
    let golden_angle = std::f64::consts::PI * (3.0 - 5f64.sqrt());
    let radius_deg = radius_km / KM_PER_DEGREE;

    (0..count)
        .filter_map(|i| {
            let distance = radius_deg * ((i as f64 + 0.5) / count as f64).sqrt();
            let angle = i as f64 * golden_angle;
            let lat = center.latitude + distance * angle.cos();
            let lng = center.longitude + distance * angle.sin();
            Coordinate::new(lat, lng).ok()
        })
        .collect()
}
