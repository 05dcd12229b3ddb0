#[inline(always)]
pub(crate) fn get_u32_be(src: &[u8]) -> u32 {
    u32::from_be_bytes([src[0], src[1], src[2], src[3]])
}

#[inline(always)]
pub(crate) fn put_u32_be(dst: &mut [u8], a: u32) {
    [dst[0], dst[1], dst[2], dst[3]] = a.to_be_bytes();
}
