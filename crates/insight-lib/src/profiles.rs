//! Static cluster profile table
//!
//! Maps each learning-style cluster id produced by the clustering model to
//! the label, description and concept tag shown to learners.

use crate::models::ClusterProfile;
use std::collections::BTreeMap;

/// Built-in profiles: (cluster id, label, concept tag, description)
const BUILTIN_PROFILES: &[(i64, &str, &str, &str)] = &[
    (
        0,
        "Fast Learner",
        "fast_learner",
        "Aktivitas belajar masih jarang, tetapi ketika mulai belajar mampu menyelesaikan modul \
         dengan sangat cepat dan mempertahankan nilai ujian yang cukup baik. Volume journey relatif \
         rendah dan hampir tidak ada revisi submission.",
    ),
    (
        1,
        "Consistent Learner",
        "consistent_learner",
        "Belajar secara konsisten, menyelesaikan banyak journey, dan memiliki nilai ujian yang \
         tinggi. Tingkat refleksi berada pada kisaran sedang.",
    ),
    (
        2,
        "Reflective Learner",
        "reflective_learner",
        "Sangat sering aktif dan menyelesaikan banyak journey, namun membutuhkan waktu yang panjang \
         per modul. Cenderung mengulas materi secara mendalam.",
    ),
    (
        3,
        "Struggling Learner",
        "struggling_learner",
        "Cukup aktif dan banyak bereksperimen dengan submission (revisi tinggi), namun nilai ujian \
         relatif rendah sehingga masih perlu penguatan konsep.",
    ),
];

/// Read-only lookup of cluster profiles, iterated in cluster-id order
#[derive(Debug, Clone, Default)]
pub struct ClusterProfileTable {
    profiles: BTreeMap<i64, ClusterProfile>,
}

impl ClusterProfileTable {
    /// Table holding the four learning-style profiles shipped with the service
    pub fn builtin() -> Self {
        Self::from_profiles(BUILTIN_PROFILES.iter().map(|(id, label, tag, description)| {
            ClusterProfile {
                cluster_id: *id,
                label: label.to_string(),
                description: description.to_string(),
                concept_tag: Some(tag.to_string()),
            }
        }))
    }

    /// Build a table from arbitrary profiles; a later duplicate id replaces an earlier one
    pub fn from_profiles(profiles: impl IntoIterator<Item = ClusterProfile>) -> Self {
        Self {
            profiles: profiles.into_iter().map(|p| (p.cluster_id, p)).collect(),
        }
    }

    pub fn lookup(&self, cluster_id: i64) -> Option<&ClusterProfile> {
        self.profiles.get(&cluster_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClusterProfile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Label used when a cluster id has no profile
pub fn fallback_label(cluster_id: i64) -> String {
    format!("Cluster {}", cluster_id)
}
