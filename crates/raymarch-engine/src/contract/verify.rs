//! Reflection checks: does a compiled kernel agree with the host layouts?

use std::mem::size_of;

use naga::{AddressSpace, ArraySize, ImageClass, Module, ShaderStage, StorageAccess, TypeInner};

use super::{
    BufferSlot, CameraRecord, ContractError, ImageSlot, KernelParams, LightRecord, ParamSlot,
    ShapeRecord, Slot, SlotSet, WorkgroupSize, BIND_GROUP, OUTPUT_STORAGE_FORMAT,
};

/// Every compute entry point of `module` with its workgroup extents.
pub fn compute_entry_points(module: &Module) -> impl Iterator<Item = (&str, WorkgroupSize)> {
    module
        .entry_points
        .iter()
        .filter(|ep| ep.stage == ShaderStage::Compute)
        .map(|ep| (ep.name.as_str(), WorkgroupSize::from(ep.workgroup_size)))
}

/// Looks up a compute entry point by name and returns its workgroup extents.
pub fn find_entry_point(module: &Module, name: &str) -> Option<WorkgroupSize> {
    compute_entry_points(module).find_map(|(ep, size)| (ep == name).then_some(size))
}

/// Checks every resource binding of `module` against the contract.
///
/// Returns the set of contract slots the module declares. Any binding outside
/// the contract, a misnamed variable, a wrong address space or a record whose
/// members drifted from the host layout is an error.
pub fn verify_module(module: &Module) -> Result<SlotSet, ContractError> {
    let mut declared = SlotSet::empty();

    for (_, var) in module.global_variables.iter() {
        let Some(binding) = var.binding.as_ref() else { continue };
        let name = var.name.clone().unwrap_or_default();

        let slot = match Slot::from_binding(binding.binding) {
            Some(slot) if binding.group == BIND_GROUP => slot,
            _ => {
                return Err(ContractError::UnexpectedBinding {
                    group: binding.group,
                    binding: binding.binding,
                    name,
                });
            }
        };

        if name != slot.name() {
            return Err(ContractError::NameMismatch {
                binding: binding.binding,
                expected: slot.name(),
                found: name,
            });
        }

        let inner = &module.types[var.ty].inner;
        match slot {
            Slot::Image(_) => check_output_image(inner)?,
            Slot::Buffer(buffer) => {
                if !matches!(var.space, AddressSpace::Storage { .. }) {
                    return Err(ContractError::WrongResource {
                        slot: slot.name(),
                        expected: "a storage buffer",
                    });
                }
                match buffer {
                    BufferSlot::Shapes => check_shape_array(module, inner)?,
                    BufferSlot::Camera => check_struct(
                        inner,
                        CameraRecord::WGSL_NAME,
                        CameraRecord::MEMBERS,
                        size_of::<CameraRecord>(),
                    )?,
                    BufferSlot::Light => check_struct(
                        inner,
                        LightRecord::WGSL_NAME,
                        LightRecord::MEMBERS,
                        size_of::<LightRecord>(),
                    )?,
                }
            }
            Slot::Params => {
                if var.space != AddressSpace::Uniform {
                    return Err(ContractError::WrongResource {
                        slot: slot.name(),
                        expected: "a uniform buffer",
                    });
                }
                let members: Vec<(&'static str, usize)> =
                    ParamSlot::ALL.iter().map(|s| (s.name(), s.offset())).collect();
                check_struct(
                    inner,
                    KernelParams::WGSL_NAME,
                    &members,
                    size_of::<KernelParams>(),
                )?;
            }
        }

        declared.insert(slot);
    }

    Ok(declared)
}

fn check_output_image(inner: &TypeInner) -> Result<(), ContractError> {
    match inner {
        TypeInner::Image {
            dim: naga::ImageDimension::D2,
            arrayed: false,
            class: ImageClass::Storage { format, access },
        } if *format == OUTPUT_STORAGE_FORMAT && access.contains(StorageAccess::STORE) => Ok(()),
        _ => Err(ContractError::WrongResource {
            slot: Slot::Image(ImageSlot::Output).name(),
            expected: "a writable 2D storage texture in the output format",
        }),
    }
}

fn check_shape_array(module: &Module, inner: &TypeInner) -> Result<(), ContractError> {
    let TypeInner::Array { base, size: ArraySize::Dynamic, stride } = inner else {
        return Err(ContractError::WrongResource {
            slot: Slot::Buffer(BufferSlot::Shapes).name(),
            expected: "a runtime-sized array of Shape",
        });
    };

    let host = size_of::<ShapeRecord>() as u32;
    if *stride != host {
        return Err(ContractError::RecordSize {
            record: ShapeRecord::WGSL_NAME,
            expected: host,
            found: *stride,
        });
    }

    check_struct(
        &module.types[*base].inner,
        ShapeRecord::WGSL_NAME,
        ShapeRecord::MEMBERS,
        size_of::<ShapeRecord>(),
    )
}

fn check_struct(
    inner: &TypeInner,
    record: &'static str,
    expected_members: &[(&'static str, usize)],
    host_size: usize,
) -> Result<(), ContractError> {
    let TypeInner::Struct { members, span } = inner else {
        return Err(ContractError::WrongResource {
            slot: record,
            expected: "a struct",
        });
    };

    let host_size = host_size as u32;
    if *span != host_size {
        return Err(ContractError::RecordSize {
            record,
            expected: host_size,
            found: *span,
        });
    }

    for &(member, offset) in expected_members {
        let found = members
            .iter()
            .find(|m| m.name.as_deref() == Some(member))
            .ok_or(ContractError::MissingMember { record, member })?;

        if found.offset != offset as u32 {
            return Err(ContractError::MemberOffset {
                record,
                member,
                expected: offset as u32,
                found: found.offset,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{wgsl_prelude, OUTPUT_FORMAT_WGSL};

    const KERNEL_BODY: &str = r#"
@compute @workgroup_size(32, 16, 1)
fn RayMarch(@builtin(global_invocation_id) id: vec3<u32>) {
    if (id.x >= params.resolution.x || id.y >= params.resolution.y) {
        return;
    }
    var color = params.fog_color;
    if (params.shape_count > 0u) {
        color = shapes[0].color * camera.forward.z;
    }
    textureStore(output, vec2<i32>(id.xy), color);
}
"#;

    fn parse(src: &str) -> Module {
        naga::front::wgsl::parse_str(src).unwrap_or_else(|e| panic!("{}", e.emit_to_string(src)))
    }

    #[test]
    fn prelude_kernel_declares_required_slots() {
        let module = parse(&(wgsl_prelude(false) + KERNEL_BODY));
        let declared = verify_module(&module).unwrap();
        assert_eq!(declared, SlotSet::required(false));
    }

    #[test]
    fn lighting_prelude_adds_light_slot() {
        let module = parse(&(wgsl_prelude(true) + KERNEL_BODY));
        let declared = verify_module(&module).unwrap();
        assert_eq!(declared, SlotSet::required(true));
        assert!(declared.contains(BufferSlot::Light));
        assert!(declared.contains(ImageSlot::Output));
    }

    #[test]
    fn entry_point_reports_workgroup_size() {
        let module = parse(&(wgsl_prelude(false) + KERNEL_BODY));
        let all: Vec<_> = compute_entry_points(&module).collect();
        assert_eq!(all, [("RayMarch", WorkgroupSize::RAYMARCH)]);
        assert_eq!(find_entry_point(&module, "RayMarch"), Some(WorkgroupSize::RAYMARCH));
        assert_eq!(find_entry_point(&module, "Missing"), None);
    }

    #[test]
    fn drifted_record_layout_is_rejected() {
        let src = wgsl_prelude(false).replace(
            "    alteration: u32,\n    reflective: u32,",
            "    reflective: u32,\n    alteration: u32,",
        );
        let module = parse(&(src + KERNEL_BODY));
        let err = verify_module(&module).unwrap_err();
        assert!(
            matches!(
                err,
                ContractError::MemberOffset { record: "Shape", member: "alteration", .. }
            ),
            "{err}"
        );
    }

    #[test]
    fn misnamed_binding_is_rejected() {
        let src = wgsl_prelude(false).replace("var<storage, read> camera:", "var<storage, read> cam:");
        let body = KERNEL_BODY.replace("camera.forward", "cam.forward");
        let module = parse(&(src + &body));
        assert_eq!(
            verify_module(&module).unwrap_err(),
            ContractError::NameMismatch {
                binding: 2,
                expected: "camera",
                found: "cam".to_string(),
            }
        );
    }

    #[test]
    fn output_in_another_format_is_rejected() {
        let src = wgsl_prelude(false).replace(OUTPUT_FORMAT_WGSL, "rgba16float");
        let module = parse(&(src + KERNEL_BODY));
        assert!(matches!(
            verify_module(&module).unwrap_err(),
            ContractError::WrongResource { slot: "output", .. }
        ));
    }

    #[test]
    fn extra_binding_is_rejected() {
        let src = wgsl_prelude(false) + "@group(1) @binding(0) var<uniform> extra: vec4<f32>;\n";
        let module = parse(&(src + KERNEL_BODY));
        assert!(matches!(
            verify_module(&module).unwrap_err(),
            ContractError::UnexpectedBinding { group: 1, binding: 0, .. }
        ));
    }
}
