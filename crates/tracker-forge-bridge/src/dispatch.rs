//! Late-bound IDispatch calls and VARIANT conversions.

#![cfg(windows)]

use std::mem::ManuallyDrop;
use std::ptr;

use windows::{
    core::{BSTR, GUID, HSTRING, PCWSTR},
    Win32::{
        Foundation::{DISP_E_EXCEPTION, DISP_E_PARAMNOTFOUND, VARIANT_BOOL},
        Globalization::GetSystemDefaultLCID,
        System::{
            Com::{
                CLSIDFromProgID, CoCreateInstance, IDispatch, CLSCTX_LOCAL_SERVER, DISPATCH_FLAGS,
                DISPATCH_METHOD, DISPATCH_PROPERTYGET, DISPATCH_PROPERTYPUT, DISPPARAMS, EXCEPINFO,
            },
            Ole::DISPID_PROPERTYPUT,
            Variant::{
                VARIANT, VARENUM, VT_BOOL, VT_BSTR, VT_CY, VT_DATE, VT_DISPATCH, VT_EMPTY, VT_ERROR,
                VT_I2, VT_I4, VT_I8, VT_NULL, VT_R4, VT_R8, VT_UI1,
            },
        },
    },
};

use crate::values::{currency_to_f64, Scalar, Value2};

/// Writes `vt` and lets `fill` set the matching union member.
///
/// The union fields are wrapped in `ManuallyDrop`, so they are written with
/// `ptr::write` rather than assignment.
fn build_variant(vt: VARENUM, fill: impl FnOnce(&mut VARIANT)) -> VARIANT {
    let mut v = VARIANT::default();
    unsafe {
        ptr::write(&mut (*v.Anonymous.Anonymous).vt, vt);
    }
    fill(&mut v);
    v
}

pub fn empty() -> VARIANT {
    VARIANT::default()
}

pub fn from_bool(val: bool) -> VARIANT {
    build_variant(VT_BOOL, |v| unsafe {
        let flag = VARIANT_BOOL(if val { -1 } else { 0 });
        ptr::write(&mut (*v.Anonymous.Anonymous).Anonymous.boolVal, flag);
    })
}

pub fn from_f64(val: f64) -> VARIANT {
    build_variant(VT_R8, |v| unsafe {
        ptr::write(&mut (*v.Anonymous.Anonymous).Anonymous.dblVal, val);
    })
}

pub fn from_i32(val: i32) -> VARIANT {
    build_variant(VT_I4, |v| unsafe {
        ptr::write(&mut (*v.Anonymous.Anonymous).Anonymous.lVal, val);
    })
}

pub fn from_str(val: &str) -> VARIANT {
    build_variant(VT_BSTR, |v| unsafe {
        ptr::write(
            &mut (*v.Anonymous.Anonymous).Anonymous.bstrVal,
            ManuallyDrop::new(BSTR::from(val)),
        );
    })
}

pub fn from_error(scode: i32) -> VARIANT {
    build_variant(VT_ERROR, |v| unsafe {
        ptr::write(&mut (*v.Anonymous.Anonymous).Anonymous.scode, scode);
    })
}

/// An omitted optional argument.
pub fn missing() -> VARIANT {
    from_error(DISP_E_PARAMNOTFOUND.0)
}

pub fn from_value2(value: Value2) -> VARIANT {
    match value {
        Value2::Empty => empty(),
        Value2::Bool(b) => from_bool(b),
        Value2::Number(n) => from_f64(n),
        Value2::Text(s) => from_str(&s),
        Value2::Error(scode) => from_error(scode),
    }
}

pub fn from_dispatch(obj: &DispatchObject) -> VARIANT {
    build_variant(VT_DISPATCH, |v| unsafe {
        ptr::write(
            &mut (*v.Anonymous.Anonymous).Anonymous.pdispVal,
            ManuallyDrop::new(Some(obj.inner.clone())),
        );
    })
}

fn vt(v: &VARIANT) -> VARENUM {
    unsafe { v.Anonymous.Anonymous.vt }
}

pub fn to_scalar(v: &VARIANT) -> Scalar {
    unsafe {
        let data = &v.Anonymous.Anonymous.Anonymous;
        match vt(v) {
            t if t == VT_EMPTY || t == VT_NULL => Scalar::Empty,
            t if t == VT_BOOL => Scalar::Bool(data.boolVal.0 != 0),
            t if t == VT_R8 => Scalar::Number(data.dblVal),
            t if t == VT_R4 => Scalar::Number(f64::from(data.fltVal)),
            t if t == VT_I4 => Scalar::Number(f64::from(data.lVal)),
            t if t == VT_I2 => Scalar::Number(f64::from(data.iVal)),
            t if t == VT_UI1 => Scalar::Number(f64::from(data.bVal)),
            t if t == VT_I8 => Scalar::Number(data.llVal as f64),
            // OLE dates are day serials, the same number Value2 reports
            t if t == VT_DATE => Scalar::Number(data.date),
            t if t == VT_CY => Scalar::Number(currency_to_f64(data.cyVal.int64)),
            t if t == VT_BSTR => Scalar::Text(data.bstrVal.to_string()),
            t if t == VT_ERROR => Scalar::Error(data.scode),
            t => Scalar::Other(t.0),
        }
    }
}

/// An IDispatch object.
#[derive(Clone)]
pub struct DispatchObject {
    inner: IDispatch,
}

impl DispatchObject {
    /// Instantiate a COM server by ProgID, e.g. `Excel.Application`.
    pub fn create(progid: &str) -> Result<Self, String> {
        unsafe {
            let clsid = CLSIDFromProgID(&HSTRING::from(progid))
                .map_err(|e| format!("CLSIDFromProgID('{progid}') failed: {e}"))?;
            let inner: IDispatch = CoCreateInstance(&clsid, None, CLSCTX_LOCAL_SERVER)
                .map_err(|e| format!("CoCreateInstance('{progid}') failed: {e}"))?;
            Ok(Self { inner })
        }
    }

    fn dispid(&self, member: &str) -> Result<i32, String> {
        let wide: Vec<u16> = member.encode_utf16().chain(std::iter::once(0)).collect();
        let names = [PCWSTR(wide.as_ptr())];
        let mut id = 0i32;
        unsafe {
            self.inner
                .GetIDsOfNames(&GUID::zeroed(), names.as_ptr(), 1, GetSystemDefaultLCID(), &mut id)
                .map_err(|e| format!("GetIDsOfNames('{member}') failed: {e}"))?;
        }
        Ok(id)
    }

    /// One `Invoke` call. `args` are in source order.
    fn invoke(
        &self,
        member: &str,
        flags: DISPATCH_FLAGS,
        args: &[VARIANT],
    ) -> Result<VARIANT, String> {
        let id = self.dispid(member)?;
        // DISPPARAMS wants the last argument first
        let mut rgvarg: Vec<VARIANT> = args.iter().rev().cloned().collect();
        let mut put_id = [DISPID_PROPERTYPUT];
        let is_put = flags == DISPATCH_PROPERTYPUT;
        let params = DISPPARAMS {
            rgvarg: if rgvarg.is_empty() {
                ptr::null_mut()
            } else {
                rgvarg.as_mut_ptr()
            },
            rgdispidNamedArgs: if is_put {
                put_id.as_mut_ptr()
            } else {
                ptr::null_mut()
            },
            cArgs: rgvarg.len() as u32,
            cNamedArgs: u32::from(is_put),
        };

        let mut result = VARIANT::default();
        let mut except = EXCEPINFO::default();
        unsafe {
            self.inner
                .Invoke(
                    id,
                    &GUID::zeroed(),
                    GetSystemDefaultLCID(),
                    flags,
                    &params,
                    if is_put { None } else { Some(&mut result) },
                    Some(&mut except),
                    None,
                )
                .map_err(|e| describe_failure(&e, &except, member))?;
        }
        Ok(result)
    }

    /// `obj.Member` or `obj.Member(args)` as a property read.
    pub fn get(&self, member: &str, args: &[VARIANT]) -> Result<VARIANT, String> {
        self.invoke(member, DISPATCH_PROPERTYGET, args)
    }

    /// `obj.Member = value`.
    pub fn put(&self, member: &str, value: VARIANT) -> Result<(), String> {
        self.invoke(member, DISPATCH_PROPERTYPUT, &[value]).map(|_| ())
    }

    /// `obj.Member(args)` as a method call.
    pub fn call(&self, member: &str, args: &[VARIANT]) -> Result<VARIANT, String> {
        self.invoke(member, DISPATCH_METHOD, args)
    }

    /// Property read that must yield another object.
    pub fn object(&self, member: &str, args: &[VARIANT]) -> Result<DispatchObject, String> {
        let v = self.get(member, args)?;
        to_object(&v, member)
    }

    /// Property read that must yield an integer count.
    pub fn count(&self) -> Result<i32, String> {
        match to_scalar(&self.get("Count", &[])?) {
            Scalar::Number(n) => Ok(n as i32),
            _ => Err("'Count' did not return a number".to_string()),
        }
    }
}

pub fn to_object(v: &VARIANT, member: &str) -> Result<DispatchObject, String> {
    if vt(v) != VT_DISPATCH {
        return Err(format!(
            "'{member}' returned VT={} instead of an object",
            vt(v).0
        ));
    }
    let disp: &Option<IDispatch> = unsafe { &v.Anonymous.Anonymous.Anonymous.pdispVal };
    disp.clone()
        .map(|inner| DispatchObject { inner })
        .ok_or_else(|| format!("'{member}' returned a null object"))
}

fn describe_failure(err: &windows::core::Error, except: &EXCEPINFO, member: &str) -> String {
    if err.code() != DISP_E_EXCEPTION {
        return format!("Invoke('{member}') failed: {err}");
    }
    let text = |b: &BSTR, fallback: &str| {
        if b.is_empty() {
            fallback.to_string()
        } else {
            b.to_string()
        }
    };
    format!(
        "COM exception in '{member}': {} (source: {})",
        text(&except.bstrDescription, "no description"),
        text(&except.bstrSource, "unknown")
    )
}
