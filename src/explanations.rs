//! Patient-facing disease descriptions.

use crate::models::DiseaseLabel;

/// Shown when a label has no entry in [`EXPLANATIONS`].
pub const NO_EXPLANATION: &str = "No explanation available";

pub const EXPLANATIONS: &[(DiseaseLabel, &str)] = &[
    (
        DiseaseLabel::Amd,
        "Age-related macular degeneration (AMD) is a leading cause of vision loss in older \
         adults. It affects the macula, the central part of the retina responsible for sharp, \
         detailed vision. AMD can cause blurred or lost central vision, making it difficult to \
         see faces, read, or perform other everyday tasks. Common in people over 50.",
    ),
    (
        DiseaseLabel::Cnv,
        "Choroidal neovascularization (CNV) is a condition where abnormal blood vessels grow in \
         the choroid, a layer of tissue behind the retina. This can lead to fluid and blood \
         leaking into the retina, damaging it and causing vision loss. CNV is often associated \
         with age-related macular degeneration (AMD).",
    ),
    (
        DiseaseLabel::Csr,
        "Central Serous Retinopathy (CSR), also known as Central Serous Chorioretinopathy (CSC), \
         is a condition where fluid accumulates under the retina, causing blurred or distorted \
         vision. It primarily affects the macula, the central part of the retina responsible \
         for sharp, detailed vision. CSR is often linked to stress, high cortisol levels, or \
         steroid use.",
    ),
    (
        DiseaseLabel::Dme,
        "Diabetic Macular Edema (DME) is a serious eye condition that occurs in people with \
         diabetes, causing fluid buildup in the macula, the central part of the retina \
         responsible for sharp, central vision. This fluid buildup leads to swelling and \
         thickening of the macula, resulting in blurred or distorted vision. DME is a leading \
         cause of vision loss and blindness in working-age adults with diabetes.",
    ),
    (
        DiseaseLabel::Dr,
        "Diabetic retinopathy (DR) is a serious eye disease caused by damage to the blood \
         vessels in the retina due to diabetes. This damage can lead to vision loss and even \
         blindness if left untreated. DR is the leading cause of vision loss in working-age \
         adults.",
    ),
    (
        DiseaseLabel::Drusen,
        "Drusen are small, yellow deposits that form under the retina, the light-sensitive \
         tissue at the back of the eye. They are typically made of lipids and proteins and can \
         be a sign of aging, with many people over 40 having some. While small, hard drusen are \
         often harmless, larger, soft drusen, particularly in the macula (the central part of \
         the retina), can be an early sign of age-related macular degeneration (AMD).",
    ),
    (
        DiseaseLabel::Mh,
        "Macular hole (MH) is a full-thickness defect in the retina at the center of the \
         macula, causing central vision loss. This condition can lead to distortions in vision, \
         like seeing wavy lines or a blind spot in the center. Macular holes are often \
         idiopathic, meaning they develop without a clear cause, and they can be treated \
         surgically to attempt to close the hole and improve vision.",
    ),
    (
        DiseaseLabel::Normal,
        "No abnormalities detected: Healthy retinal scan.",
    ),
];

/// Look up the description for a canonical label.
pub fn lookup(label: DiseaseLabel) -> Option<&'static str> {
    EXPLANATIONS
        .iter()
        .find(|(l, _)| *l == label)
        .map(|(_, text)| *text)
}

/// Description, or [`NO_EXPLANATION`] if none is known.
pub fn explain(label: DiseaseLabel) -> &'static str {
    lookup(label).unwrap_or(NO_EXPLANATION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_label_has_explanation() {
        for label in DiseaseLabel::ALL {
            assert!(lookup(label).is_some(), "missing explanation for {}", label);
        }
    }

    #[test]
    fn test_normal_text() {
        assert_eq!(
            explain(DiseaseLabel::Normal),
            "No abnormalities detected: Healthy retinal scan."
        );
    }

    #[test]
    fn test_explanation_mentions_label() {
        assert!(explain(DiseaseLabel::Dme).contains("(DME)"));
        assert!(explain(DiseaseLabel::Amd).contains("(AMD)"));
    }
}
