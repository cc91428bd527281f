//! Station repository trait and in-memory implementation.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::domain::{GeoPoint, Station, StationId, StationLocation};
use crate::geo::haversine_km;

use super::error::StationError;

/// Read-only access to the station dataset.
pub trait StationRepository {
    /// Stations whose great-circle distance from `center` is at most
    /// `radius_km`.
    fn find_within_radius(
        &self,
        center: GeoPoint,
        radius_km: f64,
    ) -> impl Future<Output = Result<Vec<StationLocation>, StationError>> + Send;

    /// Full details of one station.
    fn get_by_id(&self, id: StationId) -> impl Future<Output = Result<Station, StationError>> + Send;
}

/// Station dataset held in memory.
///
/// Radius queries are a linear scan, which is fine for the few thousand
/// stations of a regional dataset. Results are ordered by station id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStationRepository {
    stations: Arc<BTreeMap<StationId, Station>>,
}

impl InMemoryStationRepository {
    /// Build a repository, rejecting duplicate station ids.
    pub fn new(stations: impl IntoIterator<Item = Station>) -> Result<Self, StationError> {
        let mut by_id = BTreeMap::new();
        for station in stations {
            let id = station.id;
            if by_id.insert(id, station).is_some() {
                return Err(StationError::Dataset {
                    message: format!("duplicate station id {id}"),
                });
            }
        }
        Ok(Self {
            stations: Arc::new(by_id),
        })
    }

    /// Load a JSON array of stations.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StationError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| StationError::Io {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        let stations: Vec<Station> =
            serde_json::from_str(&contents).map_err(|e| StationError::Json {
                message: e.to_string(),
            })?;

        let repo = Self::new(stations)?;
        debug!(path = %path.display(), stations = repo.len(), "loaded station dataset");
        Ok(repo)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

impl StationRepository for InMemoryStationRepository {
    async fn find_within_radius(
        &self,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<StationLocation>, StationError> {
        if radius_km.is_nan() || radius_km < 0.0 {
            return Err(StationError::InvalidRadius(radius_km));
        }

        Ok(self
            .stations
            .values()
            .filter(|s| haversine_km(center, s.location) <= radius_km)
            .map(Station::as_location)
            .collect())
    }

    async fn get_by_id(&self, id: StationId) -> Result<Station, StationError> {
        self.stations
            .get(&id)
            .cloned()
            .ok_or(StationError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn p(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    fn repo() -> InMemoryStationRepository {
        InMemoryStationRepository::new(vec![
            Station::new(StationId(3), p(0.0, 0.5)),
            Station::new(StationId(1), p(0.0, 0.1)).with_brand("Orlen"),
            Station::new(StationId(2), p(0.0, 2.0)),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn radius_query_filters_and_orders_by_id() {
        // 0.5 degrees of longitude at the equator is ~55.6 km
        let found = repo().find_within_radius(p(0.0, 0.0), 60.0).await.unwrap();
        let ids: Vec<_> = found.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![StationId(1), StationId(3)]);
    }

    #[tokio::test]
    async fn zero_radius_is_allowed() {
        let found = repo().find_within_radius(p(0.0, 0.1), 0.0).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn invalid_radius() {
        let err = repo().find_within_radius(p(0.0, 0.0), -1.0).await.unwrap_err();
        assert!(matches!(err, StationError::InvalidRadius(_)));
    }

    #[tokio::test]
    async fn get_by_id() {
        let repo = repo();
        let s = repo.get_by_id(StationId(1)).await.unwrap();
        assert_eq!(s.brand.as_deref(), Some("Orlen"));

        let err = repo.get_by_id(StationId(99)).await.unwrap_err();
        assert!(matches!(err, StationError::NotFound(StationId(99))));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = InMemoryStationRepository::new(vec![
            Station::new(StationId(1), p(0.0, 0.0)),
            Station::new(StationId(1), p(1.0, 1.0)),
        ])
        .unwrap_err();
        assert!(matches!(err, StationError::Dataset { .. }));
    }

    #[tokio::test]
    async fn loads_json_dataset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stations.json");
        std::fs::write(
            &path,
            r#"[
                {"id": 10, "location": {"lat": 52.1, "lon": 21.0},
                 "name": "Station A", "brand": "Shell",
                 "price_per_litre": 6.49, "currency": "PLN"},
                {"id": 11, "location": {"lat": 52.3, "lon": 21.2}}
            ]"#,
        )
        .unwrap();

        let repo = InMemoryStationRepository::from_json_file(&path).unwrap();
        assert_eq!(repo.len(), 2);

        let a = repo.get_by_id(StationId(10)).await.unwrap();
        assert_eq!(a.price_per_litre, Some(6.49));
        assert_eq!(a.currency.as_deref(), Some("PLN"));

        let b = repo.get_by_id(StationId(11)).await.unwrap();
        assert_eq!(b.brand, None);
    }

    #[test]
    fn out_of_range_coordinates_fail_to_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stations.json");
        std::fs::write(&path, r#"[{"id": 1, "location": {"lat": 95.0, "lon": 0.0}}]"#).unwrap();

        let err = InMemoryStationRepository::from_json_file(&path).unwrap_err();
        assert!(matches!(err, StationError::Json { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = InMemoryStationRepository::from_json_file("/nonexistent/stations.json").unwrap_err();
        assert!(matches!(err, StationError::Io { .. }));
    }
}
