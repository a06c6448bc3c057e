/// Conversion between the ANSI and OEM 8-bit character sets.
///
/// Both directions preserve length, byte for byte.
pub trait TextCodecPort: Send + Sync {
    fn ansi_to_oem(&self, input: &[u8]) -> Vec<u8>;
    fn oem_to_ansi(&self, input: &[u8]) -> Vec<u8>;
}
