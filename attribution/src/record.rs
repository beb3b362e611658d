use crate::params::{AttributionParams, TrackingParam};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable attribution state carried in the attribution cookie.
///
/// Serialized as a flat JSON object; parameters that were never observed are
/// omitted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_medium: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_campaign: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_term: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gclid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fbclid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msclkid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttclid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub li_fat_id: Option<String>,
    /// Set by the first capture and never changed afterwards.
    pub first_seen: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl AttributionRecord {
    fn empty(now: DateTime<Utc>) -> Self {
        AttributionRecord {
            utm_source: None,
            utm_medium: None,
            utm_campaign: None,
            utm_term: None,
            utm_content: None,
            gclid: None,
            fbclid: None,
            msclkid: None,
            ttclid: None,
            li_fat_id: None,
            first_seen: now,
            last_updated: now,
        }
    }

    /// Folds a fresh capture into the prior record.
    ///
    /// Only the captured keys are overwritten; everything else in `prior` is
    /// kept, including `first_seen`. Without a prior record, `first_seen` is
    /// `now`.
    pub fn merge(
        prior: Option<AttributionRecord>,
        captured: &AttributionParams,
        now: DateTime<Utc>,
    ) -> Self {
        let mut record = prior.unwrap_or_else(|| Self::empty(now));
        for (param, value) in captured.iter() {
            *record.slot_mut(param) = Some(value.to_string());
        }
        record.last_updated = now;
        record
    }

    pub fn get(&self, param: TrackingParam) -> Option<&str> {
        let slot = match param {
            TrackingParam::UtmSource => &self.utm_source,
            TrackingParam::UtmMedium => &self.utm_medium,
            TrackingParam::UtmCampaign => &self.utm_campaign,
            TrackingParam::UtmTerm => &self.utm_term,
            TrackingParam::UtmContent => &self.utm_content,
            TrackingParam::Gclid => &self.gclid,
            TrackingParam::Fbclid => &self.fbclid,
            TrackingParam::Msclkid => &self.msclkid,
            TrackingParam::Ttclid => &self.ttclid,
            TrackingParam::LiFatId => &self.li_fat_id,
        };
        slot.as_deref()
    }

    fn slot_mut(&mut self, param: TrackingParam) -> &mut Option<String> {
        match param {
            TrackingParam::UtmSource => &mut self.utm_source,
            TrackingParam::UtmMedium => &mut self.utm_medium,
            TrackingParam::UtmCampaign => &mut self.utm_campaign,
            TrackingParam::UtmTerm => &mut self.utm_term,
            TrackingParam::UtmContent => &mut self.utm_content,
            TrackingParam::Gclid => &mut self.gclid,
            TrackingParam::Fbclid => &mut self.fbclid,
            TrackingParam::Msclkid => &mut self.msclkid,
            TrackingParam::Ttclid => &mut self.ttclid,
            TrackingParam::LiFatId => &mut self.li_fat_id,
        }
    }

    /// The parameters currently held by the record, without timestamps.
    pub fn params(&self) -> AttributionParams {
        TrackingParam::ALL
            .into_iter()
            .filter_map(|p| self.get(p).map(|v| (p, v.to_string())))
            .collect()
    }
}
