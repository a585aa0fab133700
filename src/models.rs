use macaddr::MacAddr6;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MOTO_STATUS: &str = "disponivel";
pub const DEFAULT_DEVICE_STATUS: &str = "ativo";
pub const DEFAULT_ANCHOR_RANGE_M: f64 = 30.0;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        ValidationError {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Moto {
    pub id: i64,
    pub plate: String,
    pub model: String,
    pub color: String,
    pub year: i32,
    pub status: String,
    pub tag_code: Option<String>,
    pub last_lat: Option<f64>,
    pub last_lng: Option<f64>,
}

/// Body of POST and PUT on motos
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotoInput {
    #[serde(alias = "placa")]
    pub plate: String,
    #[serde(alias = "modelo")]
    pub model: String,
    #[serde(default, alias = "cor")]
    pub color: String,
    #[serde(alias = "ano")]
    pub year: i32,
    #[serde(default = "default_moto_status")]
    pub status: String,
    #[serde(default, alias = "tagCodigo")]
    pub tag_code: Option<String>,
    #[serde(default)]
    pub last_lat: Option<f64>,
    #[serde(default)]
    pub last_lng: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: i64,
    pub code: String,
    pub mac: String,
    pub calibrated_rssi: i32,
    pub battery_percent: i32,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagInput {
    #[serde(alias = "codigo")]
    pub code: String,
    pub mac: String,
    #[serde(alias = "rssiCalibrado")]
    pub calibrated_rssi: i32,
    #[serde(default = "default_battery", alias = "bateriaPercent")]
    pub battery_percent: i32,
    #[serde(default = "default_device_status")]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Anchor {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub range_meters: f64,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorInput {
    #[serde(alias = "nome")]
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_anchor_range")]
    pub range_meters: f64,
    #[serde(default = "default_device_status")]
    pub status: String,
}

fn default_moto_status() -> String {
    DEFAULT_MOTO_STATUS.to_string()
}

fn default_device_status() -> String {
    DEFAULT_DEVICE_STATUS.to_string()
}

fn default_battery() -> i32 {
    100
}

fn default_anchor_range() -> f64 {
    DEFAULT_ANCHOR_RANGE_M
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn check_latitude(field: &'static str, lat: f64) -> Result<(), ValidationError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(ValidationError::new(field, format!("{} is outside [-90, 90]", lat)));
    }
    Ok(())
}

fn check_longitude(field: &'static str, lng: f64) -> Result<(), ValidationError> {
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(ValidationError::new(field, format!("{} is outside [-180, 180]", lng)));
    }
    Ok(())
}

/// Canonical upper-case, colon separated form
pub fn normalize_mac(mac: &str) -> Result<String, ValidationError> {
    mac.trim()
        .parse::<MacAddr6>()
        .map(|addr| addr.to_string().to_uppercase())
        .map_err(|e| ValidationError::new("mac", format!("'{}' is not a MAC address: {}", mac, e)))
}

impl MotoInput {
    /// Trim and check fields, returning the cleaned input
    pub fn validated(self) -> Result<Self, ValidationError> {
        let plate = required("plate", &self.plate)?.to_uppercase();
        let model = required("model", &self.model)?;
        let status = required("status", &self.status)?;

        if !(1900..=2100).contains(&self.year) {
            return Err(ValidationError::new("year", format!("{} is not a plausible year", self.year)));
        }
        if let Some(lat) = self.last_lat {
            check_latitude("lastLat", lat)?;
        }
        if let Some(lng) = self.last_lng {
            check_longitude("lastLng", lng)?;
        }

        let tag_code = self
            .tag_code
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        Ok(MotoInput {
            plate,
            model,
            color: self.color.trim().to_string(),
            year: self.year,
            status,
            tag_code,
            last_lat: self.last_lat,
            last_lng: self.last_lng,
        })
    }
}

impl TagInput {
    pub fn validated(self) -> Result<Self, ValidationError> {
        let code = required("code", &self.code)?;
        let mac = normalize_mac(&self.mac)?;
        let status = required("status", &self.status)?;

        if self.calibrated_rssi > 0 {
            return Err(ValidationError::new(
                "calibratedRssi",
                format!("{} dBm must not be positive", self.calibrated_rssi),
            ));
        }
        if !(0..=100).contains(&self.battery_percent) {
            return Err(ValidationError::new(
                "batteryPercent",
                format!("{} is outside [0, 100]", self.battery_percent),
            ));
        }

        Ok(TagInput {
            code,
            mac,
            calibrated_rssi: self.calibrated_rssi,
            battery_percent: self.battery_percent,
            status,
        })
    }
}

impl AnchorInput {
    pub fn validated(self) -> Result<Self, ValidationError> {
        let name = required("name", &self.name)?;
        let status = required("status", &self.status)?;
        check_latitude("latitude", self.latitude)?;
        check_longitude("longitude", self.longitude)?;

        if !self.range_meters.is_finite() || self.range_meters <= 0.0 {
            return Err(ValidationError::new(
                "rangeMeters",
                format!("{} must be positive", self.range_meters),
            ));
        }

        Ok(AnchorInput {
            name,
            latitude: self.latitude,
            longitude: self.longitude,
            range_meters: self.range_meters,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moto_json(body: &str) -> MotoInput {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_moto_accepts_portuguese_field_names() {
        let input = moto_json(r#"{"placa":"abc1d23","modelo":"CG 160","cor":"preta","ano":2022,"tagCodigo":"TAG-0001"}"#);
        let moto = input.validated().unwrap();
        assert_eq!(moto.plate, "ABC1D23");
        assert_eq!(moto.model, "CG 160");
        assert_eq!(moto.status, DEFAULT_MOTO_STATUS);
        assert_eq!(moto.tag_code.as_deref(), Some("TAG-0001"));
    }

    #[test]
    fn test_moto_rejects_bad_fields() {
        let blank = moto_json(r#"{"plate":"  ","model":"X","year":2020}"#);
        assert_eq!(blank.validated().unwrap_err().field, "plate");

        let old = moto_json(r#"{"plate":"P","model":"X","year":1800}"#);
        assert_eq!(old.validated().unwrap_err().field, "year");

        let lost = moto_json(r#"{"plate":"P","model":"X","year":2020,"lastLat":95.0}"#);
        assert_eq!(lost.validated().unwrap_err().field, "lastLat");
    }

    #[test]
    fn test_blank_tag_code_becomes_none() {
        let input = moto_json(r#"{"plate":"P","model":"X","year":2020,"tagCode":"  "}"#);
        assert_eq!(input.validated().unwrap().tag_code, None);
    }

    #[test]
    fn test_mac_normalization() {
        let colon = normalize_mac("aa:bb:cc:dd:ee:ff").unwrap();
        let hyphen = normalize_mac("AA-BB-CC-DD-EE-FF").unwrap();
        assert_eq!(colon, hyphen);
        assert_eq!(colon, colon.to_uppercase());
        assert!(normalize_mac("not-a-mac").is_err());
    }

    #[test]
    fn test_tag_validation() {
        let tag: TagInput = serde_json::from_str(
            r#"{"codigo":"TAG-0001","mac":"aa:bb:cc:dd:ee:01","rssiCalibrado":-59}"#,
        )
        .unwrap();
        let tag = tag.validated().unwrap();
        assert_eq!(tag.battery_percent, 100);
        assert_eq!(tag.status, DEFAULT_DEVICE_STATUS);

        let loud: TagInput = serde_json::from_str(
            r#"{"code":"T","mac":"aa:bb:cc:dd:ee:01","calibratedRssi":3}"#,
        )
        .unwrap();
        assert_eq!(loud.validated().unwrap_err().field, "calibratedRssi");

        let drained: TagInput = serde_json::from_str(
            r#"{"code":"T","mac":"aa:bb:cc:dd:ee:01","calibratedRssi":-60,"batteryPercent":120}"#,
        )
        .unwrap();
        assert_eq!(drained.validated().unwrap_err().field, "batteryPercent");
    }

    #[test]
    fn test_anchor_validation() {
        let anchor: AnchorInput =
            serde_json::from_str(r#"{"nome":"Anchor A-01","latitude":-23.53,"longitude":-46.70}"#).unwrap();
        let anchor = anchor.validated().unwrap();
        assert_eq!(anchor.range_meters, DEFAULT_ANCHOR_RANGE_M);

        let nowhere: AnchorInput =
            serde_json::from_str(r#"{"name":"A","latitude":0.0,"longitude":200.0}"#).unwrap();
        assert_eq!(nowhere.validated().unwrap_err().field, "longitude");

        let blind: AnchorInput =
            serde_json::from_str(r#"{"name":"A","latitude":0.0,"longitude":0.0,"rangeMeters":0.0}"#).unwrap();
        assert_eq!(blind.validated().unwrap_err().field, "rangeMeters");
    }
}
