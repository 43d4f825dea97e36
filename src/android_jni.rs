//! JNI bindings for the Android app.
//!
//! Each public function here corresponds to an `external fun` declaration
//! in GuidanceBridge.kt. The function names follow JNI naming conventions:
//! Java_<package>_<class>_<method> with dots replaced by underscores.
//! Structured results cross the boundary as JSON; failures are logged and
//! returned as `null`.

use jni::objects::{JByteArray, JClass};
use jni::sys::{jdouble, jint, jstring};
use jni::JNIEnv;
use log::{error, LevelFilter};

use crate::camera::camera_target;
use crate::gpx::route_from_gpx_json;
use crate::route::TransportMode;

const LOG_TAG: &str = "ndkarte-guidance";

fn to_jstring(env: &JNIEnv, value: &str) -> jstring {
    match env.new_string(value) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            error!("failed to create Java string: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Returns the library version.
/// Maps to: GuidanceBridge.version() -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndkarte_app_GuidanceBridge_version(
    env: JNIEnv,
    _class: JClass,
) -> jstring {
    to_jstring(&env, crate::VERSION)
}

/// Routes `log` output to logcat. Safe to call more than once.
/// Maps to: GuidanceBridge.initLogging()
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndkarte_app_GuidanceBridge_initLogging(
    _env: JNIEnv,
    _class: JClass,
) {
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag(LOG_TAG),
    );
}

/// Builds a guidance route from GPX bytes.
/// Maps to: GuidanceBridge.routeFromGpx(data: ByteArray, toleranceM: Double) -> String?
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndkarte_app_GuidanceBridge_routeFromGpx<'local>(
    env: JNIEnv<'local>,
    _class: JClass<'local>,
    data: JByteArray<'local>,
    tolerance_m: jdouble,
) -> jstring {
    let bytes = match env.convert_byte_array(&data) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("failed to read GPX bytes: {e}");
            return std::ptr::null_mut();
        }
    };

    match route_from_gpx_json(&bytes, tolerance_m) {
        Ok(json) => to_jstring(&env, &json),
        Err(e) => {
            error!("{e}");
            std::ptr::null_mut()
        }
    }
}

/// Camera altitude and pitch for a transport mode (0 = automobile,
/// 1 = walking) and speed.
/// Maps to: GuidanceBridge.cameraTarget(mode: Int, speedMps: Double) -> String?
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndkarte_app_GuidanceBridge_cameraTarget(
    env: JNIEnv,
    _class: JClass,
    mode: jint,
    speed_mps: jdouble,
) -> jstring {
    let Some(mode) = TransportMode::from_code(mode) else {
        error!("unknown transport mode {mode}");
        return std::ptr::null_mut();
    };

    match serde_json::to_string(&camera_target(mode, speed_mps)) {
        Ok(json) => to_jstring(&env, &json),
        Err(e) => {
            error!("JSON serialize error: {e}");
            std::ptr::null_mut()
        }
    }
}
