use std::ffi::c_void;

use windows::{core::*, Win32::Media::Audio::ERole};

// Yoinked from https://github.com/DvdGiessen/microphone-mute-indicator/blob/e1b291efff0a5f89bc1242cbd14bff8ddd1a52a1/src/main.rs#L133

// Implementation of reversed engineered COM object for changing default audio endpoint
#[allow(non_upper_case_globals)]
pub const PolicyConfig: GUID = GUID::from_u128(0x870af99c_171d_4f9e_af0d_e63df40c2bc9);

define_interface!(
    IPolicyConfig,
    IPolicyConfig_Vtbl,
    0xf8679f50_850a_41cf_9c72_430f290290c8
);
impl std::ops::Deref for IPolicyConfig {
    type Target = IUnknown;
    fn deref(&self) -> &Self::Target {
        unsafe { std::mem::transmute(self) }
    }
}
interface_hierarchy!(IPolicyConfig, IUnknown);
impl IPolicyConfig {
    #[allow(non_snake_case, clippy::missing_safety_doc)]
    pub unsafe fn SetDefaultEndpoint<P0>(&self, wszDeviceId: P0, role: ERole) -> Result<()>
    where
        P0: Param<PWSTR>,
    {
        (Interface::vtable(self).SetDefaultEndpoint)(
            Interface::as_raw(self),
            wszDeviceId.param().abi(),
            role,
        )
        .ok()
    }
}

/// Only `SetDefaultEndpoint` is ever called, everything before it just has to
/// take up the right number of slots.
#[allow(non_snake_case)]
#[allow(non_camel_case_types)]
#[repr(C)]
pub struct IPolicyConfig_Vtbl {
    pub base__: IUnknown_Vtbl,
    /// GetMixFormat, GetDeviceFormat, ResetDeviceFormat, SetDeviceFormat,
    /// GetProcessingPeriod, SetProcessingPeriod, GetShareMode, SetShareMode,
    /// GetPropertyValue, SetPropertyValue
    _reserved: [usize; 10],
    pub SetDefaultEndpoint:
        unsafe extern "system" fn(this: *mut c_void, pwstrid: PWSTR, role: ERole) -> HRESULT,
    pub SetEndpointVisibility:
        unsafe extern "system" fn(this: *mut c_void, pwstrid: PWSTR, param0: i32) -> HRESULT,
}
