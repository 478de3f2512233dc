//! Class names the deployed plant-disease model was trained on.
//!
//! Order matters: index `i` of the model's output row is `PLANT_DISEASE_CLASSES[i]`.

/// PlantVillage classes in training order.
pub const PLANT_DISEASE_CLASSES: &[&str] = &[
    "Apple___Apple_scab",
    "Tomato___Late_blight",
    "Tomato___Septoria_leaf_spot",
    "Pepper_bell___Bacterial_spot",
    "Grape___Esca_Black_Measles",
    "Tomato___Bacterial_spot",
    "Blueberry___healthy",
    "Cherry_including_sour___healthy",
    "Corn_maize___healthy",
    "Raspberry___healthy",
    "Apple___healthy",
    "Grape___Leaf_blight_Isariopsis_Leaf_Spot",
    "Grape___healthy",
    "Tomato___Leaf_Mold",
    "Tomato___Tomato_Yellow_Leaf_Curl_Virus",
    "Tomato___Tomato_mosaic_virus",
    "Strawberry___Leaf_scorch",
    "Tomato___healthy",
    "Grape___Black_rot",
    "Corn_maize___Cercospora_leaf_spot Gray_leaf_spot",
    "Peach___healthy",
    "Peach___Bacterial_spot",
    "Tomato___Target_Spot",
    "Squash___Powdery_mildew",
    "Apple___Cedar_apple_rust",
    "Potato___healthy",
    "Orange___Haunglongbing_Citrus_greening",
    "Tomato___Early_blight",
    "Cherry_including_sour___Powdery_mildew",
    "Soybean___healthy",
    "Tomato___Spider_mites_Two-spotted_spider_mite",
    "Potato___Early_blight",
    "Potato___Late_blight",
    "Pepper_bell___healthy",
    "Strawberry___healthy",
    "Corn_maize___Northern_Leaf_Blight",
    "Corn_maize___Common_rust_",
    "Apple_Frogeye_Spot",
];

/// Ordered, fixed list of class names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    names: Vec<String>,
}

impl LabelSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn plant_disease() -> Self {
        Self::new(PLANT_DISEASE_CLASSES.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self::plant_disease()
    }
}
