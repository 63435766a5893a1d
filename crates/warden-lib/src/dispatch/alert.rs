//! Alert composition for owner digests
//!
//! Handles:
//! - Recipient and CC resolution (owner address, department heads)
//! - Subject and body text per escalation tier
//! - The digest table listing every resource of the owner

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::aggregate::OwnerDigest;
use crate::escalation::EscalationTier;
use crate::models::{ResourceKind, Thresholds};
use crate::remediation::RemediationAction;

/// Suffix carried by API/service identities that map to a personal mailbox
const API_IDENTITY_SUFFIX: &str = ".api";

/// Static settings used to address and word notifications
#[derive(Debug, Clone)]
pub struct AlertSettings {
    /// Account or profile label, used when a digest carries no departments
    pub account: String,
    pub sender: String,
    pub email_domain: String,
    /// Department prefix (lowercase) -> addresses copied on warning/critical
    pub heads: HashMap<String, Vec<String>>,
    pub thresholds: Thresholds,
    /// Whether critical resources are auto-remediated in this pass
    pub remediation_enabled: bool,
    /// Link to the team's cloud usage guidelines, appended to every body
    pub guidelines_url: Option<String>,
}

impl AlertSettings {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            account: "default".to_string(),
            sender: "Cloud Team <cloud@example.com>".to_string(),
            email_domain: "example.com".to_string(),
            heads: HashMap::new(),
            thresholds,
            remediation_enabled: false,
            guidelines_url: None,
        }
    }
}

/// A fully composed notification, ready for a transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub tier: EscalationTier,
    pub owner: String,
    pub sender: String,
    pub recipient: String,
    pub cc: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Builds [`Alert`]s from owner digests
#[derive(Debug, Clone)]
pub struct AlertComposer {
    settings: AlertSettings,
}

impl AlertComposer {
    pub fn new(settings: AlertSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &AlertSettings {
        &self.settings
    }

    pub fn compose(&self, tier: EscalationTier, owner: &str, digest: &OwnerDigest) -> Alert {
        let recipient = self.recipient(owner);
        let departments = self.departments(digest);
        let cc = if tier.copies_heads() {
            self.cc_for(&departments, &recipient)
        } else {
            Vec::new()
        };

        Alert {
            tier,
            owner: owner.to_string(),
            sender: self.settings.sender.clone(),
            subject: self.subject(tier, digest, &departments),
            body: self.body(tier, owner, digest, &departments),
            recipient,
            cc,
        }
    }

    /// `owner@domain`, with any API-identity suffix dropped from the owner
    pub fn recipient(&self, owner: &str) -> String {
        let local = owner.strip_suffix(API_IDENTITY_SUFFIX).unwrap_or(owner);
        format!("{}@{}", local, self.settings.email_domain)
    }

    /// Department labels for a digest: the prefix of each group before `-`,
    /// or the account label when the digest has no groups
    pub fn departments(&self, digest: &OwnerDigest) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let departments: Vec<String> = digest
            .groups
            .iter()
            .map(|g| department_of(g))
            .filter(|d| !d.is_empty() && seen.insert(d.to_lowercase()))
            .collect();

        if departments.is_empty() {
            vec![self.settings.account.to_uppercase()]
        } else {
            departments
        }
    }

    fn cc_for(&self, departments: &[String], recipient: &str) -> Vec<String> {
        let mut cc: Vec<String> = Vec::new();
        for department in departments {
            let key = department_of(department).to_lowercase();
            if let Some(heads) = self.settings.heads.get(&key) {
                for head in heads {
                    if head != recipient && !cc.contains(head) {
                        cc.push(head.clone());
                    }
                }
            }
        }
        cc
    }

    fn subject(&self, tier: EscalationTier, digest: &OwnerDigest, departments: &[String]) -> String {
        format!(
            "{} {} {}: running {}s",
            tier.as_str().to_uppercase(),
            clouds(digest),
            departments.join("/"),
            resource_noun(digest),
        )
    }

    fn body(
        &self,
        tier: EscalationTier,
        owner: &str,
        digest: &OwnerDigest,
        departments: &[String],
    ) -> String {
        let count = digest.resource_count();
        let plural = if count == 1 { "" } else { "s" };
        let noun = resource_noun(digest);
        let clouds = clouds(digest);
        let account = departments.join("/");
        let warning = self.settings.thresholds.warning_hours();
        let critical = self.settings.thresholds.critical_hours();

        let intro = match tier {
            EscalationTier::Critical => format!(
                "You have {count} {noun}{plural} running in {clouds} ({account}) and at least one \
                 has been running for longer than {critical} hours."
            ),
            EscalationTier::Warning => format!(
                "You have {count} {noun}{plural} running in {clouds} ({account}) and at least one \
                 has been running for longer than {warning} hours."
            ),
            EscalationTier::Info | EscalationTier::None => format!(
                "This is a friendly reminder that you have {count} {noun}{plural} running in \
                 {clouds} ({account})."
            ),
        };

        let closing = match tier {
            EscalationTier::Critical | EscalationTier::Warning if self.settings.remediation_enabled => {
                format!(
                    "ANY RESOURCES RUNNING FOR LONGER THAN {} HOURS WILL BE {} IMMEDIATELY!\n\n\
                     Please check your {} account and make sure there are no more offending resources.",
                    critical,
                    remediation_term(digest),
                    clouds,
                )
            }
            EscalationTier::Critical | EscalationTier::Warning => {
                "PLEASE IMMEDIATELY STOP OR TERMINATE ANY RESOURCES THAT ARE NO LONGER IN USE!"
                    .to_string()
            }
            _ => format!(
                "Please stop or terminate anything you no longer need. Resources running for \
                 longer than {warning} hours trigger a warning."
            ),
        };

        let mut body = format!(
            "Hi {},\n\n{}\n\n{}\n\n{}\n",
            greeting_name(owner),
            intro,
            digest_table(digest),
            closing,
        );
        if let Some(url) = &self.settings.guidelines_url {
            body.push_str(&format!("\nGuidelines: {}\n", url));
        }
        body
    }
}

/// First dot-separated segment of the owner, capitalized
fn greeting_name(owner: &str) -> String {
    let first = owner.split('.').next().unwrap_or(owner);
    let mut chars = first.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn department_of(group: &str) -> String {
    group.split('-').next().unwrap_or(group).to_string()
}

fn clouds(digest: &OwnerDigest) -> String {
    digest
        .providers()
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn resource_noun(digest: &OwnerDigest) -> &'static str {
    let kinds = digest.kinds();
    if kinds.len() == 1 {
        kinds.iter().next().map(|k| k.noun()).unwrap_or("resource")
    } else {
        "resource"
    }
}

fn remediation_term(digest: &OwnerDigest) -> &'static str {
    let kinds = digest.kinds();
    if kinds.len() == 1 && kinds.contains(&ResourceKind::Cluster) {
        RemediationAction::Delete.past_tense()
    } else if kinds.contains(&ResourceKind::Cluster) {
        "STOPPED OR DELETED"
    } else {
        RemediationAction::Stop.past_tense()
    }
}

fn digest_table(digest: &OwnerDigest) -> String {
    let with_groups = digest.entries.values().any(|e| e.secondary_group.is_some());

    let mut builder = Builder::default();
    let mut header = vec!["Region".to_string()];
    if with_groups {
        header.push("Group".to_string());
    }
    header.extend(["ID", "Name", "Uptime"].map(String::from));
    builder.push_record(header);

    for (region, ids) in &digest.regions {
        for id in ids {
            let Some(entry) = digest.entries.get(id) else {
                continue;
            };
            let mut row = vec![region.clone()];
            if with_groups {
                row.push(entry.secondary_group.clone().unwrap_or_default());
            }
            row.extend([id.clone(), entry.name.clone(), entry.uptime.clone()]);
            builder.push_record(row);
        }
    }

    builder.build().with(Style::ascii()).to_string()
}
