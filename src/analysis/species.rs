// Species - catalog of the bird classes both classifiers predict
//
// Class indices are fixed by the trained models: index i of a probability
// vector always refers to SPECIES[i]. Indices outside the catalog resolve
// to UNKNOWN_SPECIES instead of failing.

use serde::Serialize;

/// Number of classes every classifier must output
pub const NUM_CLASSES: usize = 6;

/// Catalog entry for one bird species
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Species {
    /// Class index in the classifier output
    pub index: usize,
    pub scientific_name: &'static str,
    pub common_name: &'static str,
    pub description: &'static str,
    /// Relative path of the display photo, if one exists
    pub image: Option<&'static str>,
}

pub static SPECIES: [Species; NUM_CLASSES] = [
    Species {
        index: 0,
        scientific_name: "Pitta sordida",
        common_name: "Hooded Pitta",
        description: "Colourful green, blue and yellow ground-dweller of tropical forest; forages on the floor for small insects and worms.",
        image: Some("images/Pitta_sordida.jpg"),
    },
    Species {
        index: 1,
        scientific_name: "Dryocopus javensis",
        common_name: "White-bellied Woodpecker",
        description: "Black woodpecker with a striking red crown; drills tree trunks for insects and nest cavities.",
        image: Some("images/Dryocopus_javensis.jpg"),
    },
    Species {
        index: 2,
        scientific_name: "Caprimulgus macrurus",
        common_name: "Large-tailed Nightjar",
        description: "Nocturnal insect-eater with bark-patterned camouflage, often found in open areas near forest.",
        image: Some("images/Caprimulgus_macrurus.jpg"),
    },
    Species {
        index: 3,
        scientific_name: "Pnoepyga pusilla",
        common_name: "Pygmy Cupwing",
        description: "Tiny, almost tail-less montane bird that hides in undergrowth; very loud song for its size.",
        image: Some("images/Pnoepyga_pusilla.jpg"),
    },
    Species {
        index: 4,
        scientific_name: "Anthipes solitaris",
        common_name: "Rufous-browed Flycatcher",
        description: "Small grey-and-white flycatcher that stays close to forest streams and has a soft song.",
        image: Some("images/Anthipes_solitaris.jpg"),
    },
    Species {
        index: 5,
        scientific_name: "Buceros rhinoceros",
        common_name: "Rhinoceros Hornbill",
        description: "Large hornbill with a curved bill and upturned casque; eats fruit, insects and small animals.",
        image: Some("images/Buceros_rhinoceros.jpg"),
    },
];

/// Fallback for class indices outside the catalog
pub static UNKNOWN_SPECIES: Species = Species {
    index: usize::MAX,
    scientific_name: "Unknown",
    common_name: "Unknown",
    description: "No description available.",
    image: None,
};

/// Look up the species for a predicted class index
pub fn species_for_class(index: usize) -> &'static Species {
    SPECIES.get(index).unwrap_or(&UNKNOWN_SPECIES)
}
