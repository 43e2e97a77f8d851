//! Well-known species used when local observations are unavailable
//!
//! Every entry has plenty of recordings upstream. The list order is part of
//! the published daily rotation; append new species at the end.

use crate::types::BirdCandidate;

/// (common name, scientific name, family, order)
const FALLBACK_SPECIES: &[(&str, &str, &str, &str)] = &[
    ("American Robin", "Turdus migratorius", "Turdidae", "Passeriformes"),
    ("Northern Cardinal", "Cardinalis cardinalis", "Cardinalidae", "Passeriformes"),
    ("Blue Jay", "Cyanocitta cristata", "Corvidae", "Passeriformes"),
    ("Eurasian Blackbird", "Turdus merula", "Turdidae", "Passeriformes"),
    ("European Robin", "Erithacus rubecula", "Muscicapidae", "Passeriformes"),
    ("Great Tit", "Parus major", "Paridae", "Passeriformes"),
    ("Black-capped Chickadee", "Poecile atricapillus", "Paridae", "Passeriformes"),
    ("Song Thrush", "Turdus philomelos", "Turdidae", "Passeriformes"),
    ("Common Nightingale", "Luscinia megarhynchos", "Muscicapidae", "Passeriformes"),
    ("Eurasian Wren", "Troglodytes troglodytes", "Troglodytidae", "Passeriformes"),
    ("Carolina Wren", "Thryothorus ludovicianus", "Troglodytidae", "Passeriformes"),
    ("Northern Mockingbird", "Mimus polyglottos", "Mimidae", "Passeriformes"),
    ("Common Loon", "Gavia immer", "Gaviidae", "Gaviiformes"),
    ("Barred Owl", "Strix varia", "Strigidae", "Strigiformes"),
    ("Tawny Owl", "Strix aluco", "Strigidae", "Strigiformes"),
    ("Common Cuckoo", "Cuculus canorus", "Cuculidae", "Cuculiformes"),
    ("Laughing Kookaburra", "Dacelo novaeguineae", "Alcedinidae", "Coraciiformes"),
    ("Mourning Dove", "Zenaida macroura", "Columbidae", "Columbiformes"),
    ("Red-winged Blackbird", "Agelaius phoeniceus", "Icteridae", "Passeriformes"),
    ("Eurasian Skylark", "Alauda arvensis", "Alaudidae", "Passeriformes"),
];

/// The global fallback list, in rotation order
pub fn fallback_birds() -> Vec<BirdCandidate> {
    FALLBACK_SPECIES
        .iter()
        .map(|(common, scientific, family, order)| BirdCandidate {
            common_name: common.to_string(),
            scientific_name: scientific.to_string(),
            family: Some(family.to_string()),
            order: Some(order.to_string()),
            region: "Global".to_string(),
        })
        .collect()
}

/// Look up family/order for a species that is also in the fallback list
pub fn known_taxonomy(scientific_name: &str) -> Option<(&'static str, &'static str)> {
    FALLBACK_SPECIES
        .iter()
        .find(|(_, sci, _, _)| sci.eq_ignore_ascii_case(scientific_name))
        .map(|(_, _, family, order)| (*family, *order))
}
