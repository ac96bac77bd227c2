use serde::{Deserialize, Serialize};

fn default_psm() -> u8 {
    3
}

fn default_oem() -> u8 {
    3
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct OcrConfig {
    /// Page segmentation mode
    #[serde(default = "default_psm")]
    pub psm: u8,
    /// OCR engine mode: 0 legacy, 1 LSTM, 2 both, anything else the default
    #[serde(default = "default_oem")]
    pub oem: u8,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            psm: default_psm(),
            oem: default_oem(),
        }
    }
}
