use crate::shapes::rect::RectF32;

pub const NUM_ANCHORS: usize = 896;

const STRIDES: [u32; 4] = [8, 16, 16, 16];
const ANCHORS_PER_LAYER: u32 = 2;
const ANCHOR_OFFSET: f32 = 0.5;

/// SSD anchors for the short range BlazeFace model, in input pixel space.
///
/// Layers sharing a stride are merged, so each 16x16 cell of the stride 8
/// layer carries 2 anchors and each 8x8 cell of the stride 16 layers carries
/// 6. The model assumes fixed size anchors, so every anchor is 1x1 and only
/// its center matters.
pub fn gen_anchors(input_width: u32, input_height: u32) -> Vec<RectF32> {
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    let mut layer_id = 0;
    while layer_id < STRIDES.len() {
        let stride = STRIDES[layer_id];

        let mut last_same_stride_layer = layer_id;
        let mut per_cell = 0;
        while last_same_stride_layer < STRIDES.len() && STRIDES[last_same_stride_layer] == stride {
            per_cell += ANCHORS_PER_LAYER;
            last_same_stride_layer += 1;
        }

        let rows = input_height.div_ceil(stride);
        let cols = input_width.div_ceil(stride);

        for y in 0..rows {
            for x in 0..cols {
                let xc = (x as f32 + ANCHOR_OFFSET) * stride as f32;
                let yc = (y as f32 + ANCHOR_OFFSET) * stride as f32;
                for _ in 0..per_cell {
                    anchors.push(RectF32::from_center(xc, yc, 1., 1.));
                }
            }
        }

        layer_id = last_same_stride_layer;
    }

    anchors
}
