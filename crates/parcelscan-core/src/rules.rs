//! Carrier rule table.
//!
//! One immutable record per `<carrier>_<state>` resource key: the known
//! notification sender addresses, the subject filters that pick the
//! state out of the carrier's mail stream, and (for delivering-state
//! rules where the notification carries one) a tracking-number pattern.
//!
//! The table is data, not a type hierarchy: the count/extract engine is
//! a single function evaluated against these records, which keeps every
//! carrier testable from mail fixtures alone.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// How matches of a rule are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleMode {
    /// Count distinct matched messages.
    Count,
    /// Extract tracking values and count distinct values.
    Extract,
}

/// A single carrier/state classification rule.
#[derive(Debug)]
pub struct CarrierRule {
    /// Resource key, `<carrier>_<state>`.
    pub key: &'static str,
    /// Candidate sender addresses, ordered, non-empty.
    pub senders: &'static [&'static str],
    /// Subject substrings; each is searched separately and the matched
    /// messages are unioned. Empty means no subject filter.
    pub subjects: &'static [&'static str],
    /// Tracking-number pattern, for extract-mode rules.
    pub pattern: Option<&'static str>,
    /// Whether matches are deduplicated by message or by tracking value.
    pub mode: RuleMode,
}

// Sender addresses shared by several states of the same carrier.
const USPS: &[&str] = &["auto-reply@usps.com"];
const UPS: &[&str] = &["mcinfo@ups.com", "pkginfo@ups.com"];
const FEDEX: &[&str] = &["TrackingUpdates@fedex.com", "fedexcanada@fedex.com"];
const CAPOST: &[&str] = &[
    "donotreply-nepasrepondre@canadapost.postescanada.ca",
    "donotreply@canadapost.ca",
];
const AUSPOST: &[&str] = &["noreply@notifications.auspost.com.au"];
const DHL: &[&str] = &[
    "donotreply_odd@dhl.com",
    "NoReply.ODD@dhl.com",
    "noreply@dhl.de",
];
const DHL_PARCEL_NL: &[&str] = &["noreply@dhlparcel.nl"];
const ROYAL: &[&str] = &["no-reply@royalmail.com"];
const EVRI: &[&str] = &["do-not-reply@evri.com"];
const HERMES: &[&str] = &["donotreply@myhermes.co.uk"];
const GLS: &[&str] = &["noreply@gls-group.eu"];
const DPD: &[&str] = &["noreply@dpd.co.uk", "donotreply@dpdgroup.com"];
const DPD_COM_PL: &[&str] = &["dpd@dpd.com.pl"];
const INPOST_PL: &[&str] = &["powiadomienia@inpost.pl"];
const POCZTA_POLSKA: &[&str] = &["powiadomienia@poczta-polska.pl"];
const POST_AT: &[&str] = &["no-reply@post.at"];
const POST_DE: &[&str] = &["noreply@deutschepost.de"];
const POST_NL: &[&str] = &["noreply@postnl.nl"];
const PUROLATOR: &[&str] = &["notifications@purolator.com"];
const INTELCOM: &[&str] = &[
    "notifications@intelcom.ca",
    "notification@dragonflyshipping.ca",
];
const WALMART: &[&str] = &["help@walmart.com", "no-reply@walmart.com"];
const BUILDINGLINK: &[&str] = &["notify@buildinglink.com"];
const BONSHAW: &[&str] = &["noreply@bonshawdistribution.ca"];

// Tracking-number patterns per carrier.
const UPS_TRACKING: &str = r"\b1Z[0-9A-Z]{16}\b";
const USPS_TRACKING: &str = r"\b9[2-5]\d{20,24}\b";
const FEDEX_TRACKING: &str = r"\b\d{20}\b|\b\d{12}\b";
const CAPOST_TRACKING: &str = r"\b\d{16}\b";
const DHL_TRACKING: &str = r"\b\d{10,11}\b";
const DHL_PARCEL_NL_TRACKING: &str = r"\b3S[A-Z0-9]{11,13}\b";
const ROYAL_TRACKING: &str = r"\b[A-Z]{2}\d{9}GB\b";
const EVRI_TRACKING: &str = r"\b[A-Z]\d{2}[A-Z]{3}\d{10}\b";
const HERMES_TRACKING: &str = r"\b\d{16}\b";
const GLS_TRACKING: &str = r"\b\d{11,12}\b";
const DPD_TRACKING: &str = r"\b\d{14}\b";
const DPD_COM_PL_TRACKING: &str = r"\b\d{13,14}\b";
const INPOST_PL_TRACKING: &str = r"\b\d{24}\b";
const POCZTA_POLSKA_TRACKING: &str = r"\b[A-Z]{2}\d{9}PL\b";
const POST_AT_TRACKING: &str = r"\b\d{22}\b";
const POST_NL_TRACKING: &str = r"\b3S[A-Z0-9]{11,13}\b";
const PUROLATOR_TRACKING: &str = r"\b[A-Z]{3}\d{9}\b";

/// The full rule table.
pub static RULES: &[CarrierRule] = &[
    // USPS
    CarrierRule {
        key: "usps_delivered",
        senders: USPS,
        subjects: &["Item Delivered"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "usps_delivering",
        senders: USPS,
        subjects: &["Expected Delivery on", "Out for Delivery"],
        pattern: Some(USPS_TRACKING),
        mode: RuleMode::Extract,
    },
    CarrierRule {
        key: "usps_exception",
        senders: USPS,
        subjects: &["Delivery Exception"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "usps_packages",
        senders: USPS,
        subjects: &["Expected Delivery on", "Out for Delivery", "Item Delivered"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "usps_mail_delivered",
        senders: USPS,
        subjects: &["Your mail was delivered"],
        pattern: None,
        mode: RuleMode::Count,
    },
    // UPS
    CarrierRule {
        key: "ups_delivered",
        senders: UPS,
        subjects: &[
            "Your UPS Package was delivered",
            "Your UPS Packages were delivered",
        ],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "ups_delivering",
        senders: UPS,
        subjects: &[
            "UPS Update: Package Scheduled for Delivery Today",
            "UPS Update: Follow Your Delivery on a Live Map",
        ],
        pattern: Some(UPS_TRACKING),
        mode: RuleMode::Extract,
    },
    CarrierRule {
        key: "ups_exception",
        senders: UPS,
        subjects: &["UPS Update: New Scheduled Delivery Date"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "ups_packages",
        senders: UPS,
        subjects: &[
            "UPS Update: Package Scheduled for Delivery Today",
            "UPS Update: Follow Your Delivery on a Live Map",
            "Your UPS Package was delivered",
            "Your UPS Packages were delivered",
        ],
        pattern: None,
        mode: RuleMode::Count,
    },
    // FedEx
    CarrierRule {
        key: "fedex_delivered",
        senders: FEDEX,
        subjects: &["Your package has been delivered", "Your packages were delivered"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "fedex_delivering",
        senders: FEDEX,
        subjects: &[
            "Delivery scheduled for today",
            "Your package is scheduled for delivery today",
            "Your package is now out for delivery",
        ],
        pattern: Some(FEDEX_TRACKING),
        mode: RuleMode::Extract,
    },
    CarrierRule {
        key: "fedex_packages",
        senders: FEDEX,
        subjects: &[
            "Delivery scheduled for today",
            "Your package is scheduled for delivery today",
            "Your package is now out for delivery",
            "Your package has been delivered",
            "Your packages were delivered",
        ],
        pattern: None,
        mode: RuleMode::Count,
    },
    // Canada Post
    CarrierRule {
        key: "capost_delivered",
        senders: CAPOST,
        subjects: &["Delivery Notification", "has been delivered"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "capost_delivering",
        senders: CAPOST,
        subjects: &["is out for delivery", "item is out for delivery"],
        pattern: Some(CAPOST_TRACKING),
        mode: RuleMode::Extract,
    },
    CarrierRule {
        key: "capost_packages",
        senders: CAPOST,
        subjects: &[],
        pattern: None,
        mode: RuleMode::Count,
    },
    // Australia Post
    CarrierRule {
        key: "auspost_delivered",
        senders: AUSPOST,
        subjects: &["Your shipment has been delivered"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "auspost_delivering",
        senders: AUSPOST,
        subjects: &["is out for delivery", "is on its way"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "auspost_packages",
        senders: AUSPOST,
        subjects: &[],
        pattern: None,
        mode: RuleMode::Count,
    },
    // DHL
    CarrierRule {
        key: "dhl_delivered",
        senders: DHL,
        subjects: &["has been delivered", "wurde zugestellt"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "dhl_delivering",
        senders: DHL,
        subjects: &["is on its way", "DHL On Demand Delivery", "kommt heute"],
        pattern: Some(DHL_TRACKING),
        mode: RuleMode::Extract,
    },
    CarrierRule {
        key: "dhl_packages",
        senders: DHL,
        subjects: &[],
        pattern: None,
        mode: RuleMode::Count,
    },
    // DHL Parcel NL
    CarrierRule {
        key: "dhl_parcel_nl_delivered",
        senders: DHL_PARCEL_NL,
        subjects: &["is bezorgd"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "dhl_parcel_nl_delivering",
        senders: DHL_PARCEL_NL,
        subjects: &["komt eraan", "is onderweg"],
        pattern: Some(DHL_PARCEL_NL_TRACKING),
        mode: RuleMode::Extract,
    },
    CarrierRule {
        key: "dhl_parcel_nl_packages",
        senders: DHL_PARCEL_NL,
        subjects: &[],
        pattern: None,
        mode: RuleMode::Count,
    },
    // Royal Mail
    CarrierRule {
        key: "royal_delivered",
        senders: ROYAL,
        subjects: &["has been delivered"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "royal_delivering",
        senders: ROYAL,
        subjects: &["is out for delivery", "on its way"],
        pattern: Some(ROYAL_TRACKING),
        mode: RuleMode::Extract,
    },
    CarrierRule {
        key: "royal_packages",
        senders: ROYAL,
        subjects: &[],
        pattern: None,
        mode: RuleMode::Count,
    },
    // Evri
    CarrierRule {
        key: "evri_delivered",
        senders: EVRI,
        subjects: &["has been delivered"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "evri_delivering",
        senders: EVRI,
        subjects: &["is out for delivery", "is on its way"],
        pattern: Some(EVRI_TRACKING),
        mode: RuleMode::Extract,
    },
    CarrierRule {
        key: "evri_packages",
        senders: EVRI,
        subjects: &[],
        pattern: None,
        mode: RuleMode::Count,
    },
    // Hermes
    CarrierRule {
        key: "hermes_delivered",
        senders: HERMES,
        subjects: &["has been delivered"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "hermes_delivering",
        senders: HERMES,
        subjects: &["is out for delivery"],
        pattern: Some(HERMES_TRACKING),
        mode: RuleMode::Extract,
    },
    CarrierRule {
        key: "hermes_packages",
        senders: HERMES,
        subjects: &[],
        pattern: None,
        mode: RuleMode::Count,
    },
    // GLS
    CarrierRule {
        key: "gls_delivered",
        senders: GLS,
        subjects: &["has been delivered", "Ihr Paket wurde zugestellt"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "gls_delivering",
        senders: GLS,
        subjects: &["out for delivery", "wird heute zugestellt"],
        pattern: Some(GLS_TRACKING),
        mode: RuleMode::Extract,
    },
    CarrierRule {
        key: "gls_packages",
        senders: GLS,
        subjects: &[],
        pattern: None,
        mode: RuleMode::Count,
    },
    // DPD
    CarrierRule {
        key: "dpd_delivered",
        senders: DPD,
        subjects: &["has been delivered"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "dpd_delivering",
        senders: DPD,
        subjects: &["is out for delivery", "is on its way"],
        pattern: Some(DPD_TRACKING),
        mode: RuleMode::Extract,
    },
    CarrierRule {
        key: "dpd_packages",
        senders: DPD,
        subjects: &[],
        pattern: None,
        mode: RuleMode::Count,
    },
    // DPD.com.pl
    CarrierRule {
        key: "dpd_com_pl_delivered",
        senders: DPD_COM_PL,
        subjects: &["została doręczona"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "dpd_com_pl_delivering",
        senders: DPD_COM_PL,
        subjects: &["jest w drodze", "dostarczymy dzisiaj"],
        pattern: Some(DPD_COM_PL_TRACKING),
        mode: RuleMode::Extract,
    },
    CarrierRule {
        key: "dpd_com_pl_packages",
        senders: DPD_COM_PL,
        subjects: &[],
        pattern: None,
        mode: RuleMode::Count,
    },
    // InPost.pl
    CarrierRule {
        key: "inpost_pl_delivered",
        senders: INPOST_PL,
        subjects: &["została dostarczona", "Paczka odebrana"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "inpost_pl_delivering",
        senders: INPOST_PL,
        subjects: &["czeka na odbiór", "jest w drodze"],
        pattern: Some(INPOST_PL_TRACKING),
        mode: RuleMode::Extract,
    },
    CarrierRule {
        key: "inpost_pl_packages",
        senders: INPOST_PL,
        subjects: &[],
        pattern: None,
        mode: RuleMode::Count,
    },
    // Poczta Polska
    CarrierRule {
        key: "poczta_polska_delivering",
        senders: POCZTA_POLSKA,
        subjects: &["przesyłka", "jest w drodze"],
        pattern: Some(POCZTA_POLSKA_TRACKING),
        mode: RuleMode::Extract,
    },
    CarrierRule {
        key: "poczta_polska_packages",
        senders: POCZTA_POLSKA,
        subjects: &[],
        pattern: None,
        mode: RuleMode::Count,
    },
    // Post AT
    CarrierRule {
        key: "post_at_delivered",
        senders: POST_AT,
        subjects: &["wurde zugestellt"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "post_at_delivering",
        senders: POST_AT,
        subjects: &["wird heute zugestellt", "ist unterwegs"],
        pattern: Some(POST_AT_TRACKING),
        mode: RuleMode::Extract,
    },
    CarrierRule {
        key: "post_at_packages",
        senders: POST_AT,
        subjects: &[],
        pattern: None,
        mode: RuleMode::Count,
    },
    // Post DE
    CarrierRule {
        key: "post_de_delivering",
        senders: POST_DE,
        subjects: &["kommt heute", "ist unterwegs"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "post_de_packages",
        senders: POST_DE,
        subjects: &[],
        pattern: None,
        mode: RuleMode::Count,
    },
    // Post NL
    CarrierRule {
        key: "post_nl_delivered",
        senders: POST_NL,
        subjects: &["is bezorgd"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "post_nl_delivering",
        senders: POST_NL,
        subjects: &["komt vandaag", "is onderweg"],
        pattern: Some(POST_NL_TRACKING),
        mode: RuleMode::Extract,
    },
    CarrierRule {
        key: "post_nl_exception",
        senders: POST_NL,
        subjects: &["bezorging is gemist", "niet thuis"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "post_nl_packages",
        senders: POST_NL,
        subjects: &[],
        pattern: None,
        mode: RuleMode::Count,
    },
    // Purolator
    CarrierRule {
        key: "purolator_delivered",
        senders: PUROLATOR,
        subjects: &["has been delivered"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "purolator_delivering",
        senders: PUROLATOR,
        subjects: &["is out for delivery"],
        pattern: Some(PUROLATOR_TRACKING),
        mode: RuleMode::Extract,
    },
    CarrierRule {
        key: "purolator_packages",
        senders: PUROLATOR,
        subjects: &[],
        pattern: None,
        mode: RuleMode::Count,
    },
    // Intelcom
    CarrierRule {
        key: "intelcom_delivered",
        senders: INTELCOM,
        subjects: &["has been delivered", "Delivered!"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "intelcom_delivering",
        senders: INTELCOM,
        subjects: &["is out for delivery", "on its way"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "intelcom_packages",
        senders: INTELCOM,
        subjects: &[],
        pattern: None,
        mode: RuleMode::Count,
    },
    // Walmart
    CarrierRule {
        key: "walmart_delivered",
        senders: WALMART,
        subjects: &["Delivered:", "Your package was delivered"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "walmart_delivering",
        senders: WALMART,
        subjects: &["Arriving today", "out for delivery"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "walmart_exception",
        senders: WALMART,
        subjects: &["Delivery update", "has been delayed"],
        pattern: None,
        mode: RuleMode::Count,
    },
    // BuildingLink
    CarrierRule {
        key: "buildinglink_delivered",
        senders: BUILDINGLINK,
        subjects: &["Package Delivery"],
        pattern: None,
        mode: RuleMode::Count,
    },
    // Bonshaw Distribution Network
    CarrierRule {
        key: "bonshaw_distribution_network_delivered",
        senders: BONSHAW,
        subjects: &["has been delivered"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "bonshaw_distribution_network_delivering",
        senders: BONSHAW,
        subjects: &["is out for delivery"],
        pattern: None,
        mode: RuleMode::Count,
    },
    CarrierRule {
        key: "bonshaw_distribution_network_packages",
        senders: BONSHAW,
        subjects: &[],
        pattern: None,
        mode: RuleMode::Count,
    },
];

/// Compiled patterns, keyed by resource key.
static PATTERNS: LazyLock<HashMap<&'static str, Regex>> = LazyLock::new(|| {
    RULES
        .iter()
        .filter_map(|rule| {
            let pattern = rule.pattern?;
            match Regex::new(pattern) {
                Ok(regex) => Some((rule.key, regex)),
                Err(err) => {
                    tracing::error!("Invalid tracking pattern for {}: {err}", rule.key);
                    None
                }
            }
        })
        .collect()
});

/// Looks up the rule for a resource key.
#[must_use]
pub fn rule(key: &str) -> Option<&'static CarrierRule> {
    RULES.iter().find(|rule| rule.key == key)
}

/// Returns the compiled tracking pattern for a resource key.
#[must_use]
pub fn pattern_for(key: &str) -> Option<&'static Regex> {
    PATTERNS.get(key)
}
