//! Cluster id + features to insight response

use crate::models::{ClusterProfile, FeatureVector, Identity, InsightResult};
use crate::profiles::{fallback_label, ClusterProfileTable};
use crate::templates::{InsightTemplateTable, TemplateError};

/// Joins the profile and template tables into insight responses
///
/// Ids missing from either table degrade to a generic label, an empty
/// description or an empty insight text rather than failing.
#[derive(Debug, Clone)]
pub struct InsightResolver {
    profiles: ClusterProfileTable,
    templates: InsightTemplateTable,
}

impl InsightResolver {
    pub fn new(profiles: ClusterProfileTable, templates: InsightTemplateTable) -> Self {
        Self {
            profiles,
            templates,
        }
    }

    /// Resolver over the built-in profiles and templates
    pub fn builtin() -> Result<Self, TemplateError> {
        Ok(Self::new(
            ClusterProfileTable::builtin(),
            InsightTemplateTable::builtin()?,
        ))
    }

    pub fn profiles(&self) -> &ClusterProfileTable {
        &self.profiles
    }

    pub fn templates(&self) -> &InsightTemplateTable {
        &self.templates
    }

    pub fn resolve(
        &self,
        cluster_id: i64,
        features: &FeatureVector,
        identity: Identity,
    ) -> InsightResult {
        let (cluster_label, short_description, concept_tag) = match self.profiles.lookup(cluster_id) {
            Some(ClusterProfile {
                label,
                description,
                concept_tag,
                ..
            }) => (label.clone(), description.clone(), concept_tag.clone()),
            None => (fallback_label(cluster_id), String::new(), None),
        };

        let insight_text = match self.templates.lookup(cluster_id) {
            Some(template) => template.render(features),
            None => String::new(),
        };

        InsightResult {
            developer_id: identity.developer_id,
            developer_name: identity.developer_name,
            cluster_id,
            cluster_label,
            concept_tag,
            short_description,
            insight_text,
        }
    }
}
