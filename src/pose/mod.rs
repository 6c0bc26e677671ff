use log::warn;
use thiserror::Error;

use crate::core::clip::{Clip, ClipOp};
use crate::core::mesh::{Labels, Mesh};
use crate::core::registry::SkeletonRegistry;
use crate::core::skeleton::{Skeleton, TransformKind};
use crate::core::trig;

#[remain::sorted]
#[derive(Error, Debug)]
pub enum Err {
    #[error("clip references unknown skeleton {0}")]
    MissingSkeleton(u16),
}

/// Pivot accumulator threaded through one clip application. Created fresh
/// per evaluation; rotate and scale center on whatever the last pivot-kind
/// operation left here.
struct PoseContext {
    pivot: [i32; 3],
}

/// Applies one clip to the mesh's live vertex and face-alpha arrays.
///
/// A mesh whose vertex labels were never grouped has nothing to pose and is
/// left untouched. Operations whose group falls outside the skeleton's
/// table are skipped.
pub fn apply(mesh: &mut Mesh, clip: &Clip, registry: &SkeletonRegistry) -> Result<(), Err> {
    if !mesh.vertex_labels().is_grouped() {
        return Ok(());
    }
    let skeleton = registry
        .get(clip.skeleton)
        .ok_or(Err::MissingSkeleton(clip.skeleton))?;

    let mut ctx = PoseContext { pivot: [0; 3] };
    for op in clip.ops() {
        apply_op(mesh, &mut ctx, op, skeleton);
    }
    Ok(())
}

/// Applies two clips split by a group mask: the secondary clip drives the
/// groups the mask names, the primary everything else. Pivot operations
/// always run so each pass keeps its own accumulator coherent. The primary
/// clip's skeleton drives both passes.
pub fn apply_blended(
    mesh: &mut Mesh,
    primary: &Clip,
    secondary: &Clip,
    mask: &[i32],
    registry: &SkeletonRegistry,
) -> Result<(), Err> {
    if !mesh.vertex_labels().is_grouped() {
        return Ok(());
    }
    let skeleton = registry
        .get(primary.skeleton)
        .ok_or(Err::MissingSkeleton(primary.skeleton))?;
    if secondary.skeleton != primary.skeleton {
        warn!(
            "blending clips {} and {}: skeleton {} drives both passes",
            primary.id, secondary.id, primary.skeleton
        );
    }

    apply_masked(mesh, primary, skeleton, mask, false);
    apply_masked(mesh, secondary, skeleton, mask, true);
    Ok(())
}

/// One blend pass. The mask is scanned forward in lockstep with the clip's
/// ascending group indices; an exhausted mask is a boundary no group can
/// match, leaving the rest of the pass to the primary clip.
fn apply_masked(mesh: &mut Mesh, clip: &Clip, skeleton: &Skeleton, mask: &[i32], matched: bool) {
    let mut ctx = PoseContext { pivot: [0; 3] };
    let mut cursor = mask.iter().copied();
    let mut boundary = cursor.next();

    for op in clip.ops() {
        let group = op.group as i32;
        while let Some(b) = boundary {
            if group > b {
                boundary = cursor.next();
            } else {
                break;
            }
        }

        let at_boundary = boundary == Some(group);
        let is_pivot = skeleton.kind(op.group) == Some(TransformKind::Pivot);
        if at_boundary == matched || is_pivot {
            apply_op(mesh, &mut ctx, op, skeleton);
        }
    }
}

fn apply_op(mesh: &mut Mesh, ctx: &mut PoseContext, op: &ClipOp, skeleton: &Skeleton) {
    let (Some(kind), Some(labels)) = (skeleton.kind(op.group), skeleton.labels(op.group)) else {
        return;
    };
    match kind {
        TransformKind::Pivot => recenter_pivot(mesh, ctx, op, labels),
        TransformKind::Translate => translate(mesh, op, labels),
        TransformKind::Rotate => rotate(mesh, ctx, op, labels),
        TransformKind::Scale => scale(mesh, ctx, op, labels),
        TransformKind::FaceAlpha => fade_faces(mesh, op, labels),
        TransformKind::Unused => {}
    }
}

/// Recenters the pivot on the mean of the labeled vertices, pre-delta, then
/// offsets it by the operands. An empty label set leaves the operands alone
/// as the pivot. No vertex moves.
fn recenter_pivot(mesh: &Mesh, ctx: &mut PoseContext, op: &ClipOp, labels: &[u8]) {
    let Labels::Grouped(groups) = &mesh.vertex_labels else {
        return;
    };

    let mut sum = [0i64; 3];
    let mut count = 0i64;
    for &label in labels {
        let Some(vertices) = groups.get(label as usize) else {
            continue;
        };
        for &v in vertices {
            let v = v as usize;
            sum[0] += mesh.vertex_x[v] as i64;
            sum[1] += mesh.vertex_y[v] as i64;
            sum[2] += mesh.vertex_z[v] as i64;
            count += 1;
        }
    }

    ctx.pivot = if count > 0 {
        [
            (sum[0] / count) as i32 + op.x,
            (sum[1] / count) as i32 + op.y,
            (sum[2] / count) as i32 + op.z,
        ]
    } else {
        [op.x, op.y, op.z]
    };
}

fn translate(mesh: &mut Mesh, op: &ClipOp, labels: &[u8]) {
    let Labels::Grouped(groups) = &mesh.vertex_labels else {
        return;
    };
    for &label in labels {
        let Some(vertices) = groups.get(label as usize) else {
            continue;
        };
        for &v in vertices {
            let v = v as usize;
            mesh.vertex_x[v] += op.x;
            mesh.vertex_y[v] += op.y;
            mesh.vertex_z[v] += op.z;
        }
    }
}

/// Fixed-point rotation about the pivot. Each operand's low 8 bits index the
/// 2048-entry tables in 8-step units; roll (z), pitch (x) and yaw (y) are
/// applied in that order, each skipped at angle zero.
fn rotate(mesh: &mut Mesh, ctx: &PoseContext, op: &ClipOp, labels: &[u8]) {
    let Labels::Grouped(groups) = &mesh.vertex_labels else {
        return;
    };
    let [px, py, pz] = ctx.pivot;

    let pitch = ((op.x & 0xff) * 8) as usize;
    let yaw = ((op.y & 0xff) * 8) as usize;
    let roll = ((op.z & 0xff) * 8) as usize;

    for &label in labels {
        let Some(vertices) = groups.get(label as usize) else {
            continue;
        };
        for &v in vertices {
            let v = v as usize;
            let mut x = (mesh.vertex_x[v] - px) as i64;
            let mut y = (mesh.vertex_y[v] - py) as i64;
            let mut z = (mesh.vertex_z[v] - pz) as i64;

            if roll != 0 {
                let (sin, cos) = (trig::sin(roll) as i64, trig::cos(roll) as i64);
                let rotated = (y * sin + x * cos) >> 16;
                y = (y * cos - x * sin) >> 16;
                x = rotated;
            }
            if pitch != 0 {
                let (sin, cos) = (trig::sin(pitch) as i64, trig::cos(pitch) as i64);
                let rotated = (y * cos - z * sin) >> 16;
                z = (y * sin + z * cos) >> 16;
                y = rotated;
            }
            if yaw != 0 {
                let (sin, cos) = (trig::sin(yaw) as i64, trig::cos(yaw) as i64);
                let rotated = (z * sin + x * cos) >> 16;
                z = (z * cos - x * sin) >> 16;
                x = rotated;
            }

            mesh.vertex_x[v] = x as i32 + px;
            mesh.vertex_y[v] = y as i32 + py;
            mesh.vertex_z[v] = z as i32 + pz;
        }
    }
}

/// Per-axis scale about the pivot, in 128ths with truncating division.
fn scale(mesh: &mut Mesh, ctx: &PoseContext, op: &ClipOp, labels: &[u8]) {
    let Labels::Grouped(groups) = &mesh.vertex_labels else {
        return;
    };
    let [px, py, pz] = ctx.pivot;

    for &label in labels {
        let Some(vertices) = groups.get(label as usize) else {
            continue;
        };
        for &v in vertices {
            let v = v as usize;
            mesh.vertex_x[v] =
                ((mesh.vertex_x[v] - px) as i64 * op.x as i64 / 128) as i32 + px;
            mesh.vertex_y[v] =
                ((mesh.vertex_y[v] - py) as i64 * op.y as i64 / 128) as i32 + py;
            mesh.vertex_z[v] =
                ((mesh.vertex_z[v] - pz) as i64 * op.z as i64 / 128) as i32 + pz;
        }
    }
}

/// Fades per-face alpha by x in 8ths of the byte range, clamped. The label
/// set indexes face-label groups here, not vertex groups.
fn fade_faces(mesh: &mut Mesh, op: &ClipOp, labels: &[u8]) {
    let Labels::Grouped(groups) = &mesh.face_labels else {
        return;
    };
    let Some(alpha) = &mut mesh.face_alpha else {
        return;
    };

    for &label in labels {
        let Some(faces) = groups.get(label as usize) else {
            continue;
        };
        for &f in faces {
            let f = f as usize;
            let faded = alpha[f] as i32 + op.x * 8;
            alpha[f] = faded.clamp(0, 255) as u8;
        }
    }
}
