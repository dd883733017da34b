#[cfg(test)]
mod tests {
    use persona_core::wire::*;
    use persona_core::*;
    use std::path::PathBuf;

    // ── Error tests ────────────────────────────────────────────

    #[test]
    fn test_error_display_discovery() {
        let err = PersonaError::Discovery {
            root: PathBuf::from("/srv/plugins"),
            reason: "no such directory".into(),
        };
        let s = err.to_string();
        assert!(s.contains("/srv/plugins"));
        assert!(s.contains("no such directory"));
    }

    #[test]
    fn test_error_display_load() {
        let err = PersonaError::load("demo", LoadErrorReason::IncompatibleContract, "env::abort");
        let s = err.to_string();
        assert!(s.contains("demo"));
        assert!(s.contains("incompatible contract"));
        assert!(s.contains("env::abort"));
        assert_eq!(err.load_reason(), Some(LoadErrorReason::IncompatibleContract));
    }

    #[test]
    fn test_error_from_io_classifies_kind() {
        let not_found = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PersonaError = not_found.into();
        assert_eq!(err.io_kind(), Some(IoErrorKind::NotFound));
        assert!(err.to_string().contains("missing"));

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err: PersonaError = denied.into();
        assert_eq!(err.io_kind(), Some(IoErrorKind::PermissionDenied));

        let bad_utf8 = std::io::Error::new(std::io::ErrorKind::InvalidData, "stream did not contain valid UTF-8");
        let err: PersonaError = bad_utf8.into();
        assert_eq!(err.io_kind(), Some(IoErrorKind::Other));
    }

    #[test]
    fn test_non_io_errors_have_no_kind() {
        assert_eq!(PersonaError::InvalidAction("x".into()).io_kind(), None);
        assert_eq!(PersonaError::Config("x".into()).load_reason(), None);
    }

    // ── Contract tests ─────────────────────────────────────────

    #[test]
    fn test_contract_is_closed_and_ordered() {
        let names: Vec<_> = CONTRACT.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "read_file",
                "write_file",
                "get_cpu_load",
                "get_free_memory",
                "get_total_memory",
                "init",
                "greet"
            ]
        );
    }

    #[test]
    fn test_greeting_format() {
        assert_eq!(greeting("world"), "Hello, world!");
    }

    #[test]
    fn test_slot_signatures() {
        assert_eq!(
            CapabilitySlot::WriteFile.signature().params,
            &[WasmType::I32, WasmType::I32, WasmType::I32, WasmType::I32]
        );
        assert!(CapabilitySlot::WriteFile.signature().results.is_empty());
        assert_eq!(CapabilitySlot::GetTotalMemory.signature().results, &[WasmType::I64]);
    }

    // ── Environment tests ──────────────────────────────────────

    #[test]
    fn test_environment_selects_direct_when_supported() {
        let env = RuntimeEnvironment {
            direct_binary: true,
            gateway_url: None,
        };
        assert_eq!(env.default_path(), ExecutionPath::DirectBinary);
        assert!(env.supports(ExecutionPath::DirectBinary));
        assert!(!env.supports(ExecutionPath::GatewayFallback));
    }

    #[test]
    fn test_environment_falls_back_to_gateway() {
        let env = RuntimeEnvironment {
            direct_binary: false,
            gateway_url: Some("http://127.0.0.1:3710".into()),
        };
        assert_eq!(env.default_path(), ExecutionPath::GatewayFallback);
        assert!(env.supports(ExecutionPath::GatewayFallback));
        assert!(!env.supports(ExecutionPath::DirectBinary));
    }

    #[test]
    fn test_execution_path_serde() {
        let json = serde_json::to_string(&ExecutionPath::GatewayFallback).unwrap();
        assert_eq!(json, "\"gateway_fallback\"");
        let back: ExecutionPath = serde_json::from_str("\"direct_binary\"").unwrap();
        assert_eq!(back, ExecutionPath::DirectBinary);
    }

    // ── Wire tests ─────────────────────────────────────────────

    #[test]
    fn test_systeminfo_response_shape() {
        let resp = SystemInfoResponse {
            success: true,
            data: Some(SystemStatus {
                cpu_load: [0.5, 0.25, 0.125],
                free_memory: 1024,
                total_memory: 4096,
            }),
            error: None,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["data"]["cpu_load"].as_array().unwrap().len(), 3);
        assert_eq!(json["data"]["free_memory"], 1024);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_write_request_content_defaults_to_none() {
        let req: FilesystemRequest =
            serde_json::from_str(r#"{"action":"writeFile","path":"/tmp/x"}"#).unwrap();
        assert_eq!(req.action().unwrap(), FsAction::WriteFile);
        assert!(req.content.is_none());
    }

    #[test]
    fn test_filesystem_response_skips_empty_fields() {
        let json = serde_json::to_value(FilesystemResponse::data("hi".into())).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "data": "hi"}));
    }
}
